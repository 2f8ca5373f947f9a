//! Run-time errors.

use semu_expand::ExpandError;
use semu_ir::LabelRef;
use thiserror::Error;

use crate::{CreditError, StepSnapshot};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("unknown function `{function}`")]
    UnknownFunction { function: String },

    #[error(transparent)]
    Credits(#[from] CreditError),

    #[error("run cancelled")]
    Cancelled,

    /// A breakpointed resume was cancelled. The session is still valid and
    /// sits at `snapshot`.
    #[error("resume interrupted after {} cycles", snapshot.cycles_so_far)]
    Interrupted { snapshot: Box<StepSnapshot> },

    #[error("jump to undefined label {label} in `{program}`")]
    UndefinedLabel { program: String, label: LabelRef },

    #[error("call depth limit of {limit} exceeded calling `{function}`")]
    CallDepthExceeded { function: String, limit: usize },

    #[error(transparent)]
    Expand(ExpandError),
}

impl From<ExpandError> for ExecError {
    fn from(err: ExpandError) -> Self {
        match err {
            ExpandError::UnknownFunction { function } => ExecError::UnknownFunction { function },
            other => ExecError::Expand(other),
        }
    }
}
