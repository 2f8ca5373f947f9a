//! Engine configuration.

use semu_eval::{CallStrategy, DEFAULT_MAX_CALL_DEPTH};
use semu_ir::Architecture;

/// Defaults applied to runs and debug sessions that do not choose for
/// themselves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Architecture used when a request names none. `None` picks the
    /// cheapest architecture able to run the requested degree.
    default_architecture: Option<Architecture>,
    call_strategy: CallStrategy,
    max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_architecture: None,
            call_strategy: CallStrategy::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn default_architecture(mut self, architecture: Architecture) -> Self {
        self.default_architecture = Some(architecture);
        self
    }

    #[must_use]
    pub fn call_strategy(mut self, strategy: CallStrategy) -> Self {
        self.call_strategy = strategy;
        self
    }

    /// Limit on nested function evaluation depth.
    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn architecture(&self) -> Option<Architecture> {
        self.default_architecture
    }

    pub fn strategy(&self) -> CallStrategy {
        self.call_strategy
    }

    pub fn call_depth(&self) -> usize {
        self.max_call_depth
    }
}
