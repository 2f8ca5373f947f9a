//! Variable storage for one run.

use rustc_hash::FxHashMap;
use semu_ir::VariableRef;

/// Values of all variables touched by a run.
///
/// Unset variables read as 0. Values are natural numbers stored as `i64`;
/// writes never go below 0.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    values: FxHashMap<VariableRef, i64>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with `inputs[i]` bound to `x(i+1)`.
    ///
    /// Negative inputs are clamped to 0.
    pub fn seeded(inputs: &[i64]) -> Self {
        let mut context = Self::new();
        for (serial, value) in (1u32..).zip(inputs) {
            context.set(VariableRef::input(serial), *value);
        }
        context
    }

    #[inline]
    pub fn get(&self, var: VariableRef) -> i64 {
        self.values.get(&var).copied().unwrap_or(0)
    }

    #[inline]
    pub fn set(&mut self, var: VariableRef, value: i64) {
        self.values.insert(var, value.max(0));
    }

    #[inline]
    pub fn result(&self) -> i64 {
        self.get(VariableRef::RESULT)
    }

    /// `(variable, value)` pairs for `vars`, in the given order.
    pub fn values_of(&self, vars: impl IntoIterator<Item = VariableRef>) -> Vec<(VariableRef, i64)> {
        vars.into_iter().map(|var| (var, self.get(var))).collect()
    }
}
