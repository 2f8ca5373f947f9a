//! Request and response types of the engine's operations.

use semu_eval::{CallStrategy, RunResult};
use semu_ir::{Architecture, VariableRef};

/// Run a registered main program at a degree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionRequest {
    pub program: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub degree: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub inputs: Vec<i64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub architecture: Option<Architecture>,
    /// Overrides the engine's configured strategy.
    #[cfg_attr(feature = "serde", serde(default))]
    pub strategy: Option<CallStrategy>,
}

impl ExecutionRequest {
    pub fn new(program: impl Into<String>, degree: usize, inputs: Vec<i64>) -> Self {
        ExecutionRequest {
            program: program.into(),
            degree,
            inputs,
            architecture: None,
            strategy: None,
        }
    }

    #[must_use]
    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = Some(architecture);
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: CallStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionResponse {
    pub result: i64,
    pub total_cycles: u64,
    /// Declared variables in listing order: `y`, inputs, work variables.
    pub variables_sorted: Vec<(VariableRef, i64)>,
    pub degree: usize,
    pub architecture: Architecture,
    pub run_number: u64,
}

impl ExecutionResponse {
    pub(crate) fn new(
        run: RunResult,
        degree: usize,
        architecture: Architecture,
        run_number: u64,
    ) -> Self {
        ExecutionResponse {
            result: run.result,
            total_cycles: run.total_cycles,
            variables_sorted: run.variables_sorted,
            degree,
            architecture,
            run_number,
        }
    }
}

/// Start a debug session on a registered main program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebugInit {
    pub program: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub degree: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub inputs: Vec<i64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub architecture: Option<Architecture>,
}

impl DebugInit {
    pub fn new(program: impl Into<String>, degree: usize, inputs: Vec<i64>) -> Self {
        DebugInit {
            program: program.into(),
            degree,
            inputs,
            architecture: None,
        }
    }

    #[must_use]
    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = Some(architecture);
        self
    }
}
