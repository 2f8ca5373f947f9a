//! Background runs.
//!
//! A submitted run executes on the rayon pool. Its state lives in a shared
//! cell guarded by a mutex; waiters block on a condition variable until the
//! state becomes `Done` or `Failed`.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use semu_eval::CancellationToken;

use crate::{EngineError, ExecutionResponse};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running,
    Done(ExecutionResponse),
    Failed(EngineError),
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunState::Done(_) | RunState::Failed(_))
    }
}

#[derive(Debug)]
struct TaskCell {
    state: Mutex<RunState>,
    finished: Condvar,
}

/// Handle to a run submitted with `EngineHandle::submit_run`.
#[derive(Clone, Debug)]
pub struct RunTask {
    cell: Arc<TaskCell>,
    cancellation: CancellationToken,
}

impl RunTask {
    pub(crate) fn new(cancellation: CancellationToken) -> Self {
        RunTask {
            cell: Arc::new(TaskCell {
                state: Mutex::new(RunState::Pending),
                finished: Condvar::new(),
            }),
            cancellation,
        }
    }

    pub fn status(&self) -> RunState {
        self.cell.state.lock().clone()
    }

    /// Ask the run to stop. It ends as `Failed` with a cancellation error
    /// unless it already finished.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Block until the run finishes.
    pub fn wait(&self) -> Result<ExecutionResponse, EngineError> {
        let mut state = self.cell.state.lock();
        while !state.is_finished() {
            self.cell.finished.wait(&mut state);
        }
        match &*state {
            RunState::Done(response) => Ok(response.clone()),
            RunState::Failed(err) => Err(err.clone()),
            RunState::Pending | RunState::Running => Err(EngineError::TaskAbandoned),
        }
    }

    pub(crate) fn start(&self) {
        *self.cell.state.lock() = RunState::Running;
    }

    pub(crate) fn finish(&self, outcome: Result<ExecutionResponse, EngineError>) {
        let mut state = self.cell.state.lock();
        *state = match outcome {
            Ok(response) => RunState::Done(response),
            Err(err) => RunState::Failed(err),
        };
        self.cell.finished.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semu_eval::ExecError;

    #[test]
    fn wait_returns_the_finished_state() {
        let task = RunTask::new(CancellationToken::new());
        assert_eq!(task.status(), RunState::Pending);

        let worker = task.clone();
        let handle = std::thread::spawn(move || {
            worker.start();
            worker.finish(Err(EngineError::Exec(ExecError::Cancelled)));
        });
        assert_eq!(task.wait(), Err(EngineError::Exec(ExecError::Cancelled)));
        assert!(handle.join().is_ok());
        assert!(task.status().is_finished());
    }

    #[test]
    fn cancel_trips_the_shared_token() {
        let token = CancellationToken::new();
        let task = RunTask::new(token.clone());
        task.cancel();
        assert!(token.is_cancelled());
    }
}
