use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Task ids with an execution currently running.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    running: Mutex<HashSet<i64>>,
}

impl InFlight {
    /// Marks `task_id` as running, or returns `None` if it already is.
    ///
    /// The mark is cleared when the returned guard drops, including when the
    /// execution panics.
    pub(crate) fn try_acquire(self: &Arc<Self>, task_id: i64) -> Option<RunGuard> {
        let inserted = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task_id);
        inserted.then(|| RunGuard {
            owner: Arc::clone(self),
            task_id,
        })
    }

    pub(crate) fn contains(&self, task_id: i64) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&task_id)
    }
}

#[derive(Debug)]
pub(crate) struct RunGuard {
    owner: Arc<InFlight>,
    task_id: i64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.owner
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.task_id);
    }
}
