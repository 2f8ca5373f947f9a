//! Observable machine state.

use semu_ir::VariableRef;

/// State of a machine after an instruction (or before the first one).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepSnapshot {
    /// 0-based index of the instruction just executed.
    pub current_instruction_index: Option<usize>,
    /// 0-based index of the instruction that runs next, `None` once halted.
    pub next_instruction_index: Option<usize>,
    pub has_more: bool,
    /// Target variable of the instruction just executed.
    pub target_variable: Option<VariableRef>,
    pub cycles_so_far: u64,
    pub result: i64,
    /// Declared variables in listing order with their values.
    pub variables_sorted: Vec<(VariableRef, i64)>,
}

impl StepSnapshot {
    pub fn value_of(&self, var: VariableRef) -> Option<i64> {
        self.variables_sorted
            .iter()
            .find(|(v, _)| *v == var)
            .map(|(_, value)| *value)
    }
}

/// Outcome of running a program to completion.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunResult {
    pub result: i64,
    pub total_cycles: u64,
    pub variables_sorted: Vec<(VariableRef, i64)>,
}

impl RunResult {
    pub fn value_of(&self, var: VariableRef) -> Option<i64> {
        self.variables_sorted
            .iter()
            .find(|(v, _)| *v == var)
            .map(|(_, value)| *value)
    }
}
