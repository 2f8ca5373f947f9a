//! Registry and engine errors.

use semu_eval::{CreditError, ExecError};
use semu_expand::ExpandError;
use semu_ir::{Architecture, LoadError};
use thiserror::Error;

/// Rejected registration. Nothing was registered.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a main program named `{name}` is already registered")]
    DuplicateMainProgram { name: String },

    #[error("a function named `{name}` is already registered")]
    DuplicateFunction { name: String },

    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no program named `{name}`")]
    ProgramNotFound { name: String },

    #[error("no debug session for user `{user}` on `{program}`")]
    SessionNotFound { user: String, program: String },

    #[error("architecture {architecture} cannot run this program, it needs at least {required}")]
    UnsupportedArchitecture {
        architecture: Architecture,
        required: Architecture,
    },

    #[error("run task ended without reporting a result")]
    TaskAbandoned,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Expand(#[from] ExpandError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl From<CreditError> for EngineError {
    fn from(err: CreditError) -> Self {
        EngineError::Exec(ExecError::Credits(err))
    }
}

impl From<LoadError> for EngineError {
    fn from(err: LoadError) -> Self {
        EngineError::Registry(RegistryError::Load(err))
    }
}
