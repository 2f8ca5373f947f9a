//! Expansion errors.

use semu_ir::{LoadError, NamesExhausted};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("cannot expand call to unknown function `{function}`")]
    UnknownFunction { function: String },

    /// A generated generation failed label validation.
    #[error(transparent)]
    Assemble(#[from] LoadError),

    #[error(transparent)]
    Names(#[from] NamesExhausted),

    #[error("degree {requested} is out of range (max degree is {max})")]
    DegreeOutOfRange { requested: usize, max: usize },
}
