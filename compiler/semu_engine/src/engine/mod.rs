//! The engine handle.
//!
//! `EngineHandle` owns everything a front end talks to: the program
//! registry, the debug sessions, the credit ledger and the run history.
//! It is cheap to clone and every clone sees the same state, so one handle
//! can be shared by any number of threads.
//!
//! # Sessions
//!
//! Debug sessions are keyed by user and program. Each session sits in its
//! own slot behind a mutex, so operations on one session are serialized
//! while different sessions proceed in parallel. The slot's cancellation
//! token is reachable without the mutex, which lets `debug_cancel`
//! interrupt a `debug_resume` that holds it. A cancel only lands while a
//! resume is in flight, and the last resume to leave clears the token, so
//! a late cancel never leaks into a later resume.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use semu_eval::{
    breakpoints_from_flags, Account, CallEvaluator, CancellationToken, CreditLedger, DebugSession,
    DebugState, ExecError, Executor, SharedResolver, StepSnapshot, UnlimitedCredits,
};
use semu_expand::Expansion;
use semu_ir::{Architecture, LoadUnit, Program, ProgramDefinition, ProgramSummary};
use tracing::{debug, warn};

use crate::{
    DebugInit, EngineConfig, EngineError, ExecutionRequest, ExecutionResponse, InMemoryRunHistory,
    ProgramRegistry, RegisteredProgram, RunHistory, RunKind, RunRecord, RunTask,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SessionKey {
    user: String,
    /// Lowercase registered name.
    program: String,
}

/// What a stopped session is recorded as.
#[derive(Clone, Debug)]
struct SessionOrigin {
    program: String,
    degree: usize,
    architecture: Architecture,
    inputs: Vec<i64>,
}

struct SessionSlot {
    session: Mutex<DebugSession>,
    cancellation: CancellationToken,
    /// Number of `debug_resume` calls in flight. Guards the token.
    resumes: Mutex<usize>,
    origin: SessionOrigin,
}

impl SessionSlot {
    fn resume(&self, breakpoints: &[bool]) -> Result<StepSnapshot, ExecError> {
        *self.resumes.lock() += 1;
        let outcome = self
            .session
            .lock()
            .resume(breakpoints_from_flags(breakpoints));
        let mut resumes = self.resumes.lock();
        *resumes -= 1;
        if *resumes == 0 {
            self.cancellation.reset();
        }
        outcome
    }

    fn cancel(&self) -> bool {
        let resumes = self.resumes.lock();
        if *resumes > 0 {
            self.cancellation.cancel();
        }
        *resumes > 0
    }
}

/// A program generation ready to run, with its start fee paid.
struct Prepared {
    program: Arc<Program>,
    architecture: Architecture,
    account: Account,
}

#[derive(Clone)]
pub struct EngineHandle {
    config: EngineConfig,
    registry: Arc<ProgramRegistry>,
    sessions: Arc<DashMap<SessionKey, Arc<SessionSlot>>>,
    ledger: Arc<dyn CreditLedger>,
    history: Arc<dyn RunHistory>,
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EngineHandle {
    /// Engine with unlimited credits and an in-memory run history.
    pub fn new(config: EngineConfig) -> Self {
        EngineHandle {
            config,
            registry: Arc::new(ProgramRegistry::new()),
            sessions: Arc::new(DashMap::new()),
            ledger: Arc::new(UnlimitedCredits),
            history: Arc::new(InMemoryRunHistory::new()),
        }
    }

    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<dyn CreditLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn RunHistory>) -> Self {
        self.history = history;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProgramRegistry> {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<dyn CreditLedger> {
        &self.ledger
    }

    pub fn account(&self, user: &str) -> Account {
        Account::new(Arc::clone(&self.ledger), user)
    }

    // Registration

    pub fn register_unit(&self, unit: &LoadUnit) -> Result<(), EngineError> {
        self.registry.register_unit(unit)?;
        Ok(())
    }

    pub fn add_main_program(&self, definition: &ProgramDefinition) -> Result<(), EngineError> {
        self.registry.add_main_program(definition)?;
        Ok(())
    }

    pub fn add_function(&self, definition: &ProgramDefinition) -> Result<(), EngineError> {
        self.registry.add_function(definition)?;
        Ok(())
    }

    // Degrees

    fn entry(&self, name: &str) -> Result<Arc<RegisteredProgram>, EngineError> {
        self.registry
            .main_program(name)
            .ok_or_else(|| EngineError::ProgramNotFound {
                name: name.to_owned(),
            })
    }

    fn functions(&self) -> SharedResolver {
        Arc::clone(&self.registry) as SharedResolver
    }

    /// Every degree of a main program, expanded on first use.
    pub fn expansion(&self, program: &str) -> Result<Arc<Expansion>, EngineError> {
        Ok(self.entry(program)?.expansion(&*self.registry)?)
    }

    pub fn max_degree(&self, program: &str) -> Result<usize, EngineError> {
        Ok(self.expansion(program)?.max_degree())
    }

    /// Max degree without expanding: 0 until something expanded it.
    pub fn cached_max_degree(&self, program: &str) -> Result<usize, EngineError> {
        Ok(self.entry(program)?.cached_max_degree())
    }

    pub fn program_at(&self, program: &str, degree: usize) -> Result<Arc<Program>, EngineError> {
        Ok(self.expansion(program)?.program_at(degree)?)
    }

    pub fn summary(&self, program: &str, degree: usize) -> Result<ProgramSummary, EngineError> {
        Ok(self.program_at(program, degree)?.summary())
    }

    pub fn runs(&self, user: &str) -> Vec<RunRecord> {
        self.history.runs(user)
    }

    /// Resolve the generation, check the architecture and charge its fee.
    fn prepare(
        &self,
        user: &str,
        name: &str,
        degree: usize,
        requested: Option<Architecture>,
    ) -> Result<Prepared, EngineError> {
        let program = self.program_at(name, degree)?;
        let required = program.minimal_architecture();
        let architecture = requested
            .or(self.config.architecture())
            .unwrap_or(required);
        if architecture < required {
            return Err(EngineError::UnsupportedArchitecture {
                architecture,
                required,
            });
        }
        let account = self.account(user);
        account.charge(architecture.run_cost())?;
        Ok(Prepared {
            program,
            architecture,
            account,
        })
    }

    fn call_evaluator(&self) -> CallEvaluator {
        CallEvaluator::new(self.functions())
            .strategy(self.config.strategy())
            .max_depth(self.config.call_depth())
    }

    // Runs

    /// Run a main program to completion and record it.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(user = %user, program = %request.program, degree = request.degree)
    )]
    pub fn execute(
        &self,
        user: &str,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResponse, EngineError> {
        self.run(user, request, None)
    }

    /// Run in the background on the rayon pool.
    pub fn submit_run(&self, user: &str, request: ExecutionRequest) -> RunTask {
        let token = CancellationToken::new();
        let task = RunTask::new(token.clone());
        let engine = self.clone();
        let user = user.to_owned();
        let handle = task.clone();
        rayon::spawn(move || {
            handle.start();
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                engine.run(&user, &request, Some(token))
            }))
            .unwrap_or(Err(EngineError::TaskAbandoned));
            handle.finish(outcome);
        });
        task
    }

    fn run(
        &self,
        user: &str,
        request: &ExecutionRequest,
        cancellation: Option<CancellationToken>,
    ) -> Result<ExecutionResponse, EngineError> {
        if cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Err(ExecError::Cancelled.into());
        }
        let prepared = self.prepare(user, &request.program, request.degree, request.architecture)?;
        let mut executor = Executor::new(self.functions())
            .strategy(request.strategy.unwrap_or(self.config.strategy()))
            .max_call_depth(self.config.call_depth())
            .account(prepared.account);
        if let Some(token) = cancellation {
            executor = executor.cancellation(token);
        }
        let result = executor.run(&prepared.program, &request.inputs)?;

        let run_number = self.history.record(
            user,
            RunRecord {
                run_number: 0,
                kind: RunKind::Execution,
                program: prepared.program.name().to_owned(),
                degree: request.degree,
                architecture: prepared.architecture,
                inputs: request.inputs.clone(),
                result: result.result,
                total_cycles: result.total_cycles,
                variables: result.variables_sorted.clone(),
            },
        );
        debug!(run_number, cycles = result.total_cycles, "run recorded");
        Ok(ExecutionResponse::new(
            result,
            request.degree,
            prepared.architecture,
            run_number,
        ))
    }

    // Debugging

    fn session_key(&self, user: &str, program: &str) -> Result<SessionKey, EngineError> {
        let entry = self.entry(program)?;
        Ok(SessionKey {
            user: user.to_owned(),
            program: entry.program().name().to_ascii_lowercase(),
        })
    }

    fn slot(&self, user: &str, program: &str) -> Result<Arc<SessionSlot>, EngineError> {
        let key = self.session_key(user, program)?;
        self.sessions
            .get(&key)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or_else(|| EngineError::SessionNotFound {
                user: user.to_owned(),
                program: program.to_owned(),
            })
    }

    /// Start a debug session, replacing any session the user has on the
    /// same program. Returns the pristine snapshot.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(user = %user, program = %init.program, degree = init.degree)
    )]
    pub fn debug_initialize(
        &self,
        user: &str,
        init: &DebugInit,
    ) -> Result<StepSnapshot, EngineError> {
        let key = self.session_key(user, &init.program)?;
        let prepared = self.prepare(user, &init.program, init.degree, init.architecture)?;
        let token = CancellationToken::new();
        let session = DebugSession::new(
            Arc::clone(&prepared.program),
            &init.inputs,
            self.call_evaluator(),
        )
        .account(prepared.account)
        .cancellation(token.clone());
        let pristine = session.pristine().clone();

        let slot = Arc::new(SessionSlot {
            session: Mutex::new(session),
            cancellation: token,
            resumes: Mutex::new(0),
            origin: SessionOrigin {
                program: prepared.program.name().to_owned(),
                degree: init.degree,
                architecture: prepared.architecture,
                inputs: init.inputs.clone(),
            },
        });
        if self.sessions.insert(key, slot).is_some() {
            warn!(user, program = %init.program, "replaced existing debug session");
        }
        Ok(pristine)
    }

    pub fn debug_step_over(&self, user: &str, program: &str) -> Result<StepSnapshot, EngineError> {
        let slot = self.slot(user, program)?;
        let snapshot = slot.session.lock().step_over()?;
        Ok(snapshot)
    }

    pub fn debug_step_back(&self, user: &str, program: &str) -> Result<StepSnapshot, EngineError> {
        let slot = self.slot(user, program)?;
        let snapshot = slot.session.lock().step_back();
        Ok(snapshot)
    }

    /// Resume until a flagged instruction is next or the program halts.
    ///
    /// `breakpoints[i]` set means stop before instruction `i`.
    pub fn debug_resume(
        &self,
        user: &str,
        program: &str,
        breakpoints: &[bool],
    ) -> Result<StepSnapshot, EngineError> {
        let snapshot = self.slot(user, program)?.resume(breakpoints)?;
        Ok(snapshot)
    }

    pub fn debug_state(&self, user: &str, program: &str) -> Result<DebugState, EngineError> {
        let slot = self.slot(user, program)?;
        let state = slot.session.lock().state();
        Ok(state)
    }

    /// Interrupt a running `debug_resume`. Does not wait for it.
    ///
    /// Without a resume in flight there is nothing to interrupt and the
    /// call has no effect.
    pub fn debug_cancel(&self, user: &str, program: &str) -> Result<(), EngineError> {
        if !self.slot(user, program)?.cancel() {
            debug!(user, program, "no resume in flight to cancel");
        }
        Ok(())
    }

    /// End the session and record it in the run history. Returns the
    /// snapshot after the last executed step.
    pub fn debug_stop(&self, user: &str, program: &str) -> Result<StepSnapshot, EngineError> {
        let key = self.session_key(user, program)?;
        let Some((_, slot)) = self.sessions.remove(&key) else {
            return Err(EngineError::SessionNotFound {
                user: user.to_owned(),
                program: program.to_owned(),
            });
        };
        let snapshot = slot.session.lock().stop();

        let origin = slot.origin.clone();
        let run_number = self.history.record(
            user,
            RunRecord {
                run_number: 0,
                kind: RunKind::Debug,
                program: origin.program,
                degree: origin.degree,
                architecture: origin.architecture,
                inputs: origin.inputs,
                result: snapshot.result,
                total_cycles: snapshot.cycles_so_far,
                variables: snapshot.variables_sorted.clone(),
            },
        );
        debug!(user, run_number, "debug session stopped");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests;
