use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// One-shot timer backing the success-feedback cue.
///
/// The timer runs as its own task and is aborted when cancelled or dropped,
/// so a torn-down workflow never observes a late completion.
pub struct SuccessCue {
    handle: JoinHandle<()>,
    done: oneshot::Receiver<()>,
}

impl SuccessCue {
    pub fn schedule(duration: Duration) -> Self {
        let (tx, done) = oneshot::channel();
        let handle = tokio::spawn(async move {
            sleep(duration).await;
            let _ = tx.send(());
        });
        Self { handle, done }
    }

    /// Wait for the cue to finish. Returns `false` if it was cancelled first.
    pub async fn elapsed(&mut self) -> bool {
        (&mut self.done).await.is_ok()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for SuccessCue {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
