//! Per-user run history.
//!
//! Completed runs and stopped debug sessions are recorded with a run number
//! counting from 1 per user.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use semu_ir::{Architecture, VariableRef};

/// How a recorded run was driven.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunKind {
    Execution,
    Debug,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunRecord {
    /// Assigned by the history when recorded.
    pub run_number: u64,
    pub kind: RunKind,
    pub program: String,
    pub degree: usize,
    pub architecture: Architecture,
    pub inputs: Vec<i64>,
    pub result: i64,
    pub total_cycles: u64,
    pub variables: Vec<(VariableRef, i64)>,
}

/// Store of finished runs.
pub trait RunHistory: Send + Sync {
    /// Record `run` for `user`, returning the run number it was given.
    fn record(&self, user: &str, run: RunRecord) -> u64;

    /// Runs of `user`, oldest first.
    fn runs(&self, user: &str) -> Vec<RunRecord>;
}

#[derive(Debug, Default)]
pub struct InMemoryRunHistory {
    runs: Mutex<FxHashMap<String, Vec<RunRecord>>>,
}

impl InMemoryRunHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunHistory for InMemoryRunHistory {
    fn record(&self, user: &str, mut run: RunRecord) -> u64 {
        let mut runs = self.runs.lock();
        let list = runs.entry(user.to_owned()).or_default();
        run.run_number = list.len() as u64 + 1;
        let number = run.run_number;
        list.push(run);
        number
    }

    fn runs(&self, user: &str) -> Vec<RunRecord> {
        self.runs.lock().get(user).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(result: i64) -> RunRecord {
        RunRecord {
            run_number: 0,
            kind: RunKind::Execution,
            program: "main".to_owned(),
            degree: 0,
            architecture: Architecture::I,
            inputs: vec![1],
            result,
            total_cycles: 3,
            variables: vec![(VariableRef::RESULT, result)],
        }
    }

    #[test]
    fn numbers_count_per_user() {
        let history = InMemoryRunHistory::new();
        assert_eq!(history.record("ada", record(1)), 1);
        assert_eq!(history.record("ada", record(2)), 2);
        assert_eq!(history.record("bob", record(3)), 1);

        let runs = history.runs("ada");
        assert_eq!(
            runs.iter().map(|r| (r.run_number, r.result)).collect::<Vec<_>>(),
            vec![(1, 1), (2, 2)]
        );
        assert!(history.runs("nobody").is_empty());
    }
}
