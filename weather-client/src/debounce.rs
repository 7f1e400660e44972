use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Runs only the last of a burst of scheduled tasks, once the burst has been
/// quiet for `window`.
///
/// Scheduling a new task cancels a pending one that has not fired yet. A task
/// whose window already elapsed is never interrupted.
pub struct Debouncer {
    window: Duration,
    pending: Option<CancellationToken>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let token = CancellationToken::new();
        self.pending = Some(token.clone());
        let deadline = Instant::now() + self.window;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!("Debounced task superseded");
                }
                _ = tokio::time::sleep_until(deadline) => {
                    task.await;
                }
            }
        });
    }

    /// Drop the pending task, if it has not fired yet
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
