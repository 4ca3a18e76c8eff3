//! Cancellable scheduled-task slots.
//!
//! A supervisor owns one slot per timer kind. Arming a slot replaces
//! whatever was armed before, so at most one task of each kind can be live
//! at any time, and dropping the slot takes the task down with it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

#[derive(Default)]
pub struct TaskSlot {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a task, aborting any previous occupant.
    pub fn arm(&self, task: JoinHandle<()>) {
        if let Some(old) = self.lock().replace(task) {
            old.abort();
        }
    }

    /// Aborts and clears the armed task, if any. Idempotent.
    pub fn cancel(&self) {
        if let Some(task) = self.lock().take() {
            task.abort();
        }
    }

    /// Whether a task is installed. The task may have already finished;
    /// this reports slot occupancy, not liveness.
    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
