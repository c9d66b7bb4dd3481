//! Per-project serialization of layer-group mutations.
//!
//! Two shakeups (or a shakeup and an LGSet edit) on the same project would
//! otherwise interleave their read-modify-write of the package document.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct ProjectLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `project_id`. Released on drop.
    pub async fn acquire(&self, project_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock();
            // Holders and waiters keep a clone; a count of 1 means idle.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(project_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Whether some task currently holds the lock for `project_id`.
    pub fn is_locked(&self, project_id: &str) -> bool {
        self.inner
            .lock()
            .get(project_id)
            .is_some_and(|l| l.try_lock().is_err())
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner.lock().len()
    }
}
