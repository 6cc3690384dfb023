use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Quiet period for search-as-you-type.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Runs only the most recently scheduled task, once `delay` passes without
/// another schedule. Must be used inside a tokio runtime.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Replace any pending task with `task`.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        if let Ok(mut slot) = self.pending.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Drop the pending task, if any. Returns whether one was waiting.
    pub fn cancel(&self) -> bool {
        match self.pending.lock() {
            Ok(mut slot) => match slot.take() {
                Some(handle) => {
                    let was_pending = !handle.is_finished();
                    handle.abort();
                    was_pending
                }
                None => false,
            },
            Err(_) => false,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
