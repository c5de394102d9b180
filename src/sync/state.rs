//! Run state ownership: at most one sync run in flight.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::RunState;

/// Shared holder of the workflow's [`RunState`].
///
/// The Idle → Running check-and-set happens under one lock, so two triggers
/// can never both win.
#[derive(Debug, Clone, Default)]
pub struct RunSlot {
    state: Arc<Mutex<RunState>>,
}

impl RunSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> RunState {
        *lock(&self.state)
    }

    /// Move to Running, or fail with [`Error::AlreadyRunning`].
    pub fn try_begin(&self) -> Result<RunGuard> {
        let mut state = lock(&self.state);
        if *state == RunState::Running {
            return Err(Error::AlreadyRunning);
        }
        *state = RunState::Running;
        Ok(RunGuard {
            state: Arc::clone(&self.state),
        })
    }
}

/// Proof that a run is in flight. Dropping it returns the slot to Idle,
/// whichever way the run ended.
#[derive(Debug)]
pub struct RunGuard {
    state: Arc<Mutex<RunState>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        *lock(&self.state) = RunState::Idle;
    }
}

fn lock(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
