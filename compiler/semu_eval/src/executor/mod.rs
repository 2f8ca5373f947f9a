//! Whole-program execution.
//!
//! `Executor` is the run-to-completion loop over `Machine::step`. Each
//! executed instruction is charged to the configured account after it
//! runs, and the cancellation token is polled before it runs.

use std::sync::Arc;

use semu_ir::Program;
use tracing::debug;

use crate::{
    Account, CallEvaluator, CallStrategy, CancellationToken, ExecError, Machine, RunResult,
    SharedResolver, DEFAULT_MAX_CALL_DEPTH,
};

/// Builder-configured program runner.
///
/// ```text
/// let result = Executor::new(functions)
///     .strategy(CallStrategy::Inline)
///     .account(account)
///     .run(&program, &[3, 4])?;
/// ```
pub struct Executor {
    functions: SharedResolver,
    strategy: CallStrategy,
    max_call_depth: usize,
    account: Option<Account>,
    cancellation: Option<CancellationToken>,
}

impl Executor {
    pub fn new(functions: SharedResolver) -> Self {
        Executor {
            functions,
            strategy: CallStrategy::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            account: None,
            cancellation: None,
        }
    }

    /// How `QUOTE` and `JUMP_EQUAL_FUNCTION` run their callee.
    #[must_use]
    pub fn strategy(mut self, strategy: CallStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Charge every executed instruction's cycles to `account`.
    ///
    /// Without an account runs are free.
    #[must_use]
    pub fn account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Call evaluator carrying this executor's strategy and depth limit.
    pub fn call_evaluator(&self) -> CallEvaluator {
        CallEvaluator::new(Arc::clone(&self.functions))
            .strategy(self.strategy)
            .max_depth(self.max_call_depth)
    }

    /// Run `program` to completion with `inputs` bound to `x1, x2, ...`.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(program = program.name(), degree = program.degree(), strategy = ?self.strategy)
    )]
    pub fn run(&self, program: &Arc<Program>, inputs: &[i64]) -> Result<RunResult, ExecError> {
        let mut machine = Machine::new(Arc::clone(program), inputs, self.call_evaluator());
        while machine.has_more() {
            if self
                .cancellation
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                debug!(cycles = machine.cycles(), "run cancelled");
                return Err(ExecError::Cancelled);
            }
            let Some(outcome) = machine.step()? else {
                break;
            };
            if let Some(account) = &self.account {
                account.charge(outcome.cost)?;
            }
        }

        let result = machine.result();
        debug!(
            result = result.result,
            cycles = result.total_cycles,
            "run finished"
        );
        Ok(result)
    }
}
