use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

struct Pending {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Trailing-edge debounce: only the last job scheduled within `window` runs.
///
/// Scheduling or cancelling also aborts a job that already started, so a
/// superseded push never lands after a newer one.
pub struct PushScheduler {
    window: Duration,
    pending: Option<Pending>,
}

impl PushScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace any pending job with `job`, to run once the window elapses.
    pub fn schedule<F>(&mut self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule_after(self.window, job);
    }

    /// Replace any pending job with `job`, to run after `delay`. A zero delay
    /// runs it right away under the same cancellation as a debounced job.
    pub fn schedule_after<F>(&mut self, delay: Duration, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => trace!("scheduled push cancelled"),
                _ = async {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    job.await;
                } => {}
            }
        });
        self.pending = Some(Pending { token, handle });
    }

    pub fn cancel(&mut self) {
        if let Some(p) = self.pending.take() {
            p.token.cancel();
        }
    }

    /// True while a job is waiting out its window or still running.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.token.is_cancelled() && !p.handle.is_finished())
    }
}

impl Drop for PushScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
