//! Function call evaluation for `QUOTE` and `JUMP_EQUAL_FUNCTION`.
//!
//! Arguments are evaluated depth-first, post-order, each nested call in a
//! fresh context through a fresh machine. The callee itself runs one of
//! two ways, selected by `CallStrategy`:
//!
//! - `Interpret`: a nested machine over the callee's degree-0 program with
//!   the argument values as inputs.
//! - `Inline`: the callee body spliced into fresh names (as the degree
//!   engine does, but with `EXIT` kept), run with the argument values
//!   seeded into the mapped input slots.
//!
//! Both produce the same value and the same cycle count. Nested evaluation
//! never charges credits; the calling instruction is charged once for its
//! whole cost.

use std::sync::Arc;

use semu_expand::{splice_callee, ExitMode, ExpandError};
use semu_ir::{
    Argument, FunctionCall, FunctionResolver, NameAllocator, Program, ProgramHeader, ProgramKind,
};

use crate::{ExecError, ExecutionContext, Machine};

/// Thread-shareable function lookup.
pub type SharedResolver = Arc<dyn FunctionResolver + Send + Sync>;

/// Default limit on nested evaluation depth.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// How a callee is executed at run time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CallStrategy {
    #[default]
    Interpret,
    Inline,
}

/// Value and cycle cost of one call, excluding the calling instruction's
/// base cost.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CallOutcome {
    pub value: i64,
    pub cycles: u64,
}

/// Evaluates function calls against a resolver.
#[derive(Clone)]
pub struct CallEvaluator {
    functions: SharedResolver,
    strategy: CallStrategy,
    max_depth: usize,
}

impl CallEvaluator {
    pub fn new(functions: SharedResolver) -> Self {
        CallEvaluator {
            functions,
            strategy: CallStrategy::default(),
            max_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    #[must_use]
    pub fn strategy(mut self, strategy: CallStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[inline]
    pub fn call_strategy(&self) -> CallStrategy {
        self.strategy
    }

    #[inline]
    pub fn functions(&self) -> &SharedResolver {
        &self.functions
    }

    /// Evaluate `call` with argument variables read from `caller`.
    ///
    /// Cycles are the sum of every nested argument call's cycles plus the
    /// callee's total cycles.
    pub fn evaluate(
        &self,
        call: &FunctionCall,
        caller: &ExecutionContext,
        depth: usize,
    ) -> Result<CallOutcome, ExecError> {
        if depth >= self.max_depth {
            return Err(ExecError::CallDepthExceeded {
                function: call.function.clone(),
                limit: self.max_depth,
            });
        }
        ensure_sufficient_stack(|| {
            let mut cycles = 0u64;
            let mut args = Vec::with_capacity(call.args.len());
            for arg in &call.args {
                match arg {
                    Argument::Variable(var) => args.push(caller.get(*var)),
                    Argument::Call(nested) => {
                        let outcome = self.evaluate(nested, caller, depth + 1)?;
                        cycles = cycles.saturating_add(outcome.cycles);
                        args.push(outcome.value);
                    }
                }
            }

            let callee = match self.strategy {
                CallStrategy::Interpret => self.interpret(call, &args, depth)?,
                CallStrategy::Inline => self.inline(call, &args, depth)?,
            };
            Ok(CallOutcome {
                value: callee.value,
                cycles: cycles.saturating_add(callee.cycles),
            })
        })
    }

    fn interpret(
        &self,
        call: &FunctionCall,
        args: &[i64],
        depth: usize,
    ) -> Result<CallOutcome, ExecError> {
        let callee = self.functions.resolve_function(&call.function).ok_or_else(|| {
            ExecError::UnknownFunction {
                function: call.function.clone(),
            }
        })?;
        let mut machine = Machine::nested(
            callee,
            ExecutionContext::seeded(args),
            self.clone(),
            depth + 1,
        );
        machine.run_to_end()?;
        Ok(CallOutcome {
            value: machine.context().result(),
            cycles: machine.cycles(),
        })
    }

    fn inline(
        &self,
        call: &FunctionCall,
        args: &[i64],
        depth: usize,
    ) -> Result<CallOutcome, ExecError> {
        let mut names = NameAllocator::default();
        let frame = splice_callee(call, &mut names, &*self.functions, ExitMode::Keep)?;
        let scratch = Program::assemble(
            ProgramHeader::new(frame.callee.name(), ProgramKind::Function),
            0,
            frame.body,
            names,
        )
        .map_err(ExpandError::from)?;

        let mut context = ExecutionContext::new();
        for (slot, value) in frame.inputs.iter().zip(args) {
            context.set(*slot, *value);
        }
        let mut machine = Machine::nested(Arc::new(scratch), context, self.clone(), depth + 1);
        machine.run_to_end()?;
        Ok(CallOutcome {
            value: machine.context().get(frame.result),
            cycles: machine.cycles(),
        })
    }
}

/// Grow the native stack before recursing if less than the red zone
/// remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 100 * 1024;
    const STACK_PER_RECURSION: usize = 1024 * 1024;
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests;
