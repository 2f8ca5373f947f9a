//! Load-time errors.
//!
//! Every variant rejects the whole unit being loaded; nothing is partially
//! registered.

use thiserror::Error;

use crate::LabelRef;

/// Error produced while turning records into a `Program` generation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("unknown instruction `{name}`")]
    UnknownInstruction { name: String },

    #[error("instruction `{instruction}` is missing required argument `{argument}`")]
    MissingArgument {
        instruction: String,
        argument: &'static str,
    },

    #[error("`{text}` is not a valid variable")]
    InvalidVariable { text: String },

    #[error("`{text}` is not a valid label")]
    InvalidLabel { text: String },

    #[error("`{text}` is not a valid constant")]
    InvalidConstant { text: String },

    #[error("malformed function arguments `{text}`: {reason}")]
    MalformedArguments { text: String, reason: &'static str },

    #[error("program name must not be empty")]
    EmptyName,

    #[error("label {label} is defined more than once in `{program}`")]
    DuplicateLabel { program: String, label: LabelRef },

    #[error("instruction #{instruction} of `{program}` jumps to undefined label {label}")]
    UndefinedLabel {
        program: String,
        label: LabelRef,
        instruction: usize,
    },

    #[error("`{program}` calls unknown function `{function}`")]
    UnknownFunction { program: String, function: String },

    #[error("recursive function call cycle: {}", cycle.join(" -> "))]
    RecursiveCall { cycle: Vec<String> },

    #[error("`{name}` is defined more than once in the same unit")]
    DuplicateDefinition { name: String },
}

/// A generation has used the last label number or work-variable serial, so
/// expanding it further cannot hand out a name that does not collide.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum NamesExhausted {
    #[error("no fresh label numbers left")]
    Labels,

    #[error("no fresh work-variable serials left")]
    WorkVariables,
}
