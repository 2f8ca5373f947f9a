//! Semu Eval - execution engine and debugger for S-language programs.
//!
//! # Architecture
//!
//! - `Machine`: one run; `step` executes a single instruction
//! - `CallEvaluator`: `QUOTE` / `JUMP_EQUAL_FUNCTION` callee evaluation,
//!   interpreted or inlined (`CallStrategy`)
//! - `Executor`: run to completion with credit charging and cancellation
//! - `DebugSession`: stepping with an undo/redo history and breakpoints
//! - `CreditLedger`: per-user credit balances charged by cycles

mod calls;
mod cancel;
mod context;
mod credit;
mod debugger;
mod errors;
mod executor;
mod machine;
mod snapshot;

pub use calls::{CallEvaluator, CallOutcome, CallStrategy, SharedResolver, DEFAULT_MAX_CALL_DEPTH};
pub use cancel::CancellationToken;
pub use context::ExecutionContext;
pub use credit::{Account, CreditError, CreditLedger, InMemoryCredits, UnlimitedCredits};
pub use debugger::{breakpoints_from_flags, DebugSession, DebugState, HistoryEntry};
pub use errors::ExecError;
pub use executor::Executor;
pub use machine::{Machine, StepOutcome};
pub use snapshot::{RunResult, StepSnapshot};
