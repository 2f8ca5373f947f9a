//! Semu Engine - the thread-safe front door of the S-language emulator.
//!
//! One `EngineHandle` owns:
//! - `ProgramRegistry`: main programs and functions, with per-program
//!   expansion caches
//! - the debug sessions, one per user and program
//! - a `CreditLedger` charged for every run
//! - a `RunHistory` of finished runs
//!
//! Runs execute synchronously with `EngineHandle::execute` or in the
//! background with `EngineHandle::submit_run`.

mod config;
mod engine;
mod errors;
mod history;
mod interface;
mod registry;
mod task;

use std::sync::Once;

pub use config::EngineConfig;
pub use engine::EngineHandle;
pub use errors::{EngineError, RegistryError};
pub use history::{InMemoryRunHistory, RunHistory, RunKind, RunRecord};
pub use interface::{DebugInit, ExecutionRequest, ExecutionResponse};
pub use registry::{ProgramRegistry, RegisteredProgram};
pub use task::{RunState, RunTask};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing subscriber for debugging.
///
/// Call once at startup. Output is controlled by `RUST_LOG`:
/// - `RUST_LOG=semu_eval=trace` shows every executed instruction
/// - `RUST_LOG=semu_expand=debug` shows expansion generations
///
/// Without `RUST_LOG` nothing is installed.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
