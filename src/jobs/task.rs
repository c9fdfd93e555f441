use std::future::Future;

use tokio::task::JoinHandle;

/// Handle to a spawned background loop (poll, preload, debounce flush).
///
/// Cancelling aborts the task at its next await point; dropping the handle does not.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `fut` on the current tokio runtime.
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(fut),
        }
    }

    /// Stop the task. Idempotent.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the task has run to completion or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to end. Cancellation is not an error.
    pub async fn join(self) {
        if let Err(err) = self.handle.await
            && err.is_panic()
        {
            tracing::error!(error = %err, "scheduled task panicked");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/task.rs"]
mod tests;
