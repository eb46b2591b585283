use parking_lot::Mutex;
use std::{future::Future, time::Duration};
use tokio_util::sync::CancellationToken;

/// Cancelable quiet-period timer.
///
/// Each [`schedule`](Debouncer::schedule) replaces the previous pending
/// action. Once the delay elapses the action runs to completion; cancelling
/// only affects actions still waiting on their timer. Dropping the debouncer
/// cancels the pending action.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: Mutex::new(None) }
    }

    /// Run `action` after the quiet period unless rescheduled or cancelled first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending.lock().replace(token.clone()) {
            previous.cancel();
        }

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            action.await;
        });
    }

    /// Drop the pending action, if any.
    pub fn cancel_pending(&self) {
        if let Some(token) = self.pending.lock().take() {
            token.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
