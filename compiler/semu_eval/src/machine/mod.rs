//! Single-step execution core.
//!
//! A `Machine` owns one run: the program generation, the variable context,
//! the instruction pointer and the cycle counter. `step` executes exactly
//! one instruction; the executor and the debugger are both loops over it.

use std::sync::Arc;

use semu_ir::{Instruction, LabelRef, Op, Program};
use tracing::trace;

use crate::{CallEvaluator, ExecError, ExecutionContext, RunResult, StepSnapshot};

/// What one `step` did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    /// 0-based index of the executed instruction.
    pub index: usize,
    /// Cycles the instruction cost, including any function call.
    pub cost: u64,
    /// Index of the next instruction, `None` once halted.
    pub next: Option<usize>,
}

/// Saved mutable state of a machine, for undoing a step.
#[derive(Clone, Debug)]
pub(crate) struct MachineState {
    context: ExecutionContext,
    pointer: Option<usize>,
    cycles: u64,
}

pub struct Machine {
    program: Arc<Program>,
    context: ExecutionContext,
    pointer: Option<usize>,
    cycles: u64,
    calls: CallEvaluator,
    depth: usize,
}

impl Machine {
    /// Top-level machine with `inputs` bound positionally to `x1, x2, ...`.
    pub fn new(program: Arc<Program>, inputs: &[i64], calls: CallEvaluator) -> Self {
        Self::nested(program, ExecutionContext::seeded(inputs), calls, 0)
    }

    pub(crate) fn nested(
        program: Arc<Program>,
        context: ExecutionContext,
        calls: CallEvaluator,
        depth: usize,
    ) -> Self {
        let pointer = (!program.is_empty()).then_some(0);
        Machine {
            program,
            context,
            pointer,
            cycles: 0,
            calls,
            depth,
        }
    }

    #[inline]
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    #[inline]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    #[inline]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Index of the instruction that runs next.
    #[inline]
    pub fn pointer(&self) -> Option<usize> {
        self.pointer
    }

    #[inline]
    pub fn has_more(&self) -> bool {
        self.pointer.is_some()
    }

    /// Execute one instruction. Returns `None` if already halted.
    pub fn step(&mut self) -> Result<Option<StepOutcome>, ExecError> {
        let Some(index) = self.pointer else {
            return Ok(None);
        };
        let program = Arc::clone(&self.program);
        let Some(instruction) = program.instruction(index) else {
            self.pointer = None;
            return Ok(None);
        };

        let (jump, cost) = self.execute(instruction)?;
        self.cycles = self.cycles.saturating_add(cost);
        self.pointer = match jump {
            LabelRef::Empty => (index + 1 < program.len()).then_some(index + 1),
            LabelRef::Exit => None,
            label => Some(program.position_of(label).ok_or_else(|| {
                ExecError::UndefinedLabel {
                    program: program.name().to_owned(),
                    label,
                }
            })?),
        };
        trace!(
            depth = self.depth,
            number = instruction.number,
            command = %instruction,
            cost,
            next = ?self.pointer,
            "step"
        );
        Ok(Some(StepOutcome {
            index,
            cost,
            next: self.pointer,
        }))
    }

    /// Step until halted.
    pub fn run_to_end(&mut self) -> Result<(), ExecError> {
        while self.step()?.is_some() {}
        Ok(())
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<(LabelRef, u64), ExecError> {
        let v = instruction.variable;
        let base = instruction.base_cycles();
        let value = self.context.get(v);
        let jump_if = |condition: bool, target: LabelRef| {
            if condition {
                target
            } else {
                LabelRef::Empty
            }
        };

        let outcome = match &instruction.op {
            Op::Increase => {
                self.context.set(v, value.saturating_add(1));
                (LabelRef::Empty, base)
            }
            Op::Decrease => {
                self.context.set(v, value.saturating_sub(1));
                (LabelRef::Empty, base)
            }
            Op::JumpNotZero { target } => (jump_if(value != 0, *target), base),
            Op::Neutral => (LabelRef::Empty, base),
            Op::ZeroVariable => {
                self.context.set(v, 0);
                (LabelRef::Empty, base)
            }
            Op::GotoLabel { target } => (*target, base),
            Op::Assignment { source } => {
                self.context.set(v, self.context.get(*source));
                (LabelRef::Empty, base)
            }
            Op::ConstantAssignment { constant } => {
                self.context
                    .set(v, i64::try_from(*constant).unwrap_or(i64::MAX));
                (LabelRef::Empty, base)
            }
            Op::JumpZero { target } => (jump_if(value == 0, *target), base),
            Op::JumpEqualConstant { constant, target } => {
                (jump_if(u64::try_from(value) == Ok(*constant), *target), base)
            }
            Op::JumpEqualVariable { other, target } => {
                (jump_if(value == self.context.get(*other), *target), base)
            }
            Op::Quote { call } => {
                let outcome = self.calls.evaluate(call, &self.context, self.depth)?;
                self.context.set(v, outcome.value);
                (LabelRef::Empty, base.saturating_add(outcome.cycles))
            }
            Op::JumpEqualFunction { call, target } => {
                let outcome = self.calls.evaluate(call, &self.context, self.depth)?;
                (
                    jump_if(value == outcome.value, *target),
                    base.saturating_add(outcome.cycles),
                )
            }
        };
        Ok(outcome)
    }

    /// Snapshot of the current state; `current` is the instruction just
    /// executed, if any.
    pub fn snapshot(&self, current: Option<usize>) -> StepSnapshot {
        StepSnapshot {
            current_instruction_index: current,
            next_instruction_index: self.pointer,
            has_more: self.has_more(),
            target_variable: current
                .and_then(|index| self.program.instruction(index))
                .map(|instruction| instruction.variable),
            cycles_so_far: self.cycles,
            result: self.context.result(),
            variables_sorted: self.context.values_of(self.program.variables()),
        }
    }

    pub fn result(&self) -> RunResult {
        RunResult {
            result: self.context.result(),
            total_cycles: self.cycles,
            variables_sorted: self.context.values_of(self.program.variables()),
        }
    }

    pub(crate) fn save(&self) -> MachineState {
        MachineState {
            context: self.context.clone(),
            pointer: self.pointer,
            cycles: self.cycles,
        }
    }

    pub(crate) fn restore(&mut self, state: MachineState) {
        self.context = state.context;
        self.pointer = state.pointer;
        self.cycles = state.cycles;
    }
}
