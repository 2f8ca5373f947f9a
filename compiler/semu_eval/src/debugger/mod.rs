//! Stepping debugger with an undo/redo history.
//!
//! The session keeps every executed step as a `HistoryEntry` holding the
//! resulting snapshot and the cycles that step cost. The history pointer
//! moves over that log:
//!
//! - forward at the frontier executes a new instruction,
//! - forward behind the frontier replays the cached entry,
//! - backward only moves the pointer.
//!
//! Credits follow the pointer: moving forward charges the entry's
//! `cycle_delta`, moving back refunds it. Replaying never re-executes, so a
//! replayed step always matches the original one.

use std::collections::BTreeSet;
use std::sync::Arc;

use semu_ir::Program;
use tracing::{debug, trace};

use crate::{Account, CallEvaluator, CancellationToken, ExecError, Machine, StepSnapshot};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DebugState {
    #[default]
    NotStarted,
    Stepping,
    AtBreakpoint,
    Finished,
}

/// One executed step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub snapshot: StepSnapshot,
    pub cycle_delta: u64,
}

pub struct DebugSession {
    machine: Machine,
    history: Vec<HistoryEntry>,
    /// Index of the current entry; `None` is the pristine state.
    pointer: Option<usize>,
    pristine: StepSnapshot,
    breakpoints: BTreeSet<usize>,
    state: DebugState,
    account: Option<Account>,
    cancellation: CancellationToken,
}

impl DebugSession {
    pub fn new(program: Arc<Program>, inputs: &[i64], calls: CallEvaluator) -> Self {
        let machine = Machine::new(program, inputs, calls);
        let pristine = machine.snapshot(None);
        DebugSession {
            machine,
            history: Vec::new(),
            pointer: None,
            pristine,
            breakpoints: BTreeSet::new(),
            state: DebugState::NotStarted,
            account: None,
            cancellation: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Token that interrupts a running `resume`. Clones share the flag.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    #[inline]
    pub fn program(&self) -> &Arc<Program> {
        self.machine.program()
    }

    #[inline]
    pub fn state(&self) -> DebugState {
        self.state
    }

    pub fn pristine(&self) -> &StepSnapshot {
        &self.pristine
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn breakpoints(&self) -> &BTreeSet<usize> {
        &self.breakpoints
    }

    /// Position in the history, -1 at the pristine state.
    pub fn history_pointer(&self) -> isize {
        self.pointer
            .map_or(-1, |p| isize::try_from(p).unwrap_or(isize::MAX))
    }

    /// Snapshot at the history pointer.
    pub fn current_snapshot(&self) -> &StepSnapshot {
        self.entry(self.pointer)
    }

    /// Snapshot after the last executed step.
    pub fn frontier_snapshot(&self) -> &StepSnapshot {
        self.history
            .last()
            .map_or(&self.pristine, |entry| &entry.snapshot)
    }

    fn entry(&self, pointer: Option<usize>) -> &StepSnapshot {
        pointer
            .and_then(|p| self.history.get(p))
            .map_or(&self.pristine, |entry| &entry.snapshot)
    }

    fn settle(&mut self, snapshot: &StepSnapshot) {
        self.state = if snapshot.has_more {
            DebugState::Stepping
        } else {
            DebugState::Finished
        };
    }

    /// Move one step forward.
    ///
    /// If the charge for the step fails nothing moves and the credits error
    /// is returned.
    pub fn step_over(&mut self) -> Result<StepSnapshot, ExecError> {
        let next = self.pointer.map_or(0, |p| p + 1);
        if let Some(entry) = self.history.get(next) {
            let (delta, snapshot) = (entry.cycle_delta, entry.snapshot.clone());
            if let Some(account) = &self.account {
                account.charge(delta)?;
            }
            trace!(pointer = next, delta, "replay step");
            self.pointer = Some(next);
            self.settle(&snapshot);
            return Ok(snapshot);
        }

        if !self.machine.has_more() {
            self.state = DebugState::Finished;
            return Ok(self.frontier_snapshot().clone());
        }

        let saved = self.machine.save();
        let outcome = match self.machine.step() {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                self.state = DebugState::Finished;
                return Ok(self.frontier_snapshot().clone());
            }
            Err(err) => {
                self.machine.restore(saved);
                return Err(err);
            }
        };
        if let Some(account) = &self.account {
            if let Err(err) = account.charge(outcome.cost) {
                self.machine.restore(saved);
                return Err(err.into());
            }
        }

        let snapshot = self.machine.snapshot(Some(outcome.index));
        self.history.push(HistoryEntry {
            snapshot: snapshot.clone(),
            cycle_delta: outcome.cost,
        });
        self.pointer = Some(next);
        self.settle(&snapshot);
        Ok(snapshot)
    }

    /// Move one step back, refunding that step's cycles. At the pristine
    /// state this returns the pristine snapshot and refunds nothing.
    pub fn step_back(&mut self) -> StepSnapshot {
        let Some(current) = self.pointer else {
            return self.pristine.clone();
        };
        if let (Some(account), Some(entry)) = (&self.account, self.history.get(current)) {
            account.refund(entry.cycle_delta);
        }
        self.pointer = current.checked_sub(1);
        let snapshot = self.current_snapshot().clone();
        self.settle(&snapshot);
        trace!(pointer = self.history_pointer(), "step back");
        snapshot
    }

    /// Replace the breakpoints and step until the program halts or the next
    /// instruction is a breakpoint.
    ///
    /// A cancelled token stops the loop with `ExecError::Interrupted`
    /// carrying the last completed snapshot. The token is cleared on every
    /// way out, so a cancel aimed at this resume cannot interrupt the next
    /// one, and the session can be resumed again.
    pub fn resume(
        &mut self,
        breakpoints: impl IntoIterator<Item = usize>,
    ) -> Result<StepSnapshot, ExecError> {
        self.breakpoints = breakpoints.into_iter().collect();
        let outcome = self.run_to_breakpoint();
        self.cancellation.reset();
        outcome
    }

    fn run_to_breakpoint(&mut self) -> Result<StepSnapshot, ExecError> {
        loop {
            if self.cancellation.is_cancelled() {
                debug!(pointer = self.history_pointer(), "resume interrupted");
                return Err(ExecError::Interrupted {
                    snapshot: Box::new(self.current_snapshot().clone()),
                });
            }
            let snapshot = self.step_over()?;
            if !snapshot.has_more {
                self.state = DebugState::Finished;
                return Ok(snapshot);
            }
            if snapshot
                .next_instruction_index
                .is_some_and(|next| self.breakpoints.contains(&next))
            {
                self.state = DebugState::AtBreakpoint;
                return Ok(snapshot);
            }
        }
    }

    /// End the session, returning the snapshot after the last executed step.
    pub fn stop(&mut self) -> StepSnapshot {
        self.state = DebugState::Finished;
        self.frontier_snapshot().clone()
    }
}

/// Instruction indexes whose flag is set.
pub fn breakpoints_from_flags(flags: &[bool]) -> BTreeSet<usize> {
    flags
        .iter()
        .enumerate()
        .filter_map(|(index, set)| set.then_some(index))
        .collect()
}
