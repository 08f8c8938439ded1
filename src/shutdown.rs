//! Graceful shutdown between intervals
//!
//! The Ctrl+C handler and the orchestrator share one [`ShutdownCoordinator`].
//! Intervals that have not started when shutdown is requested are skipped;
//! intervals already running finish their retries so no partial raw file is
//! left behind, and the run still compacts and checkpoints what it has.
//!
//! Requests are counted. A second request while the run is still draining
//! lets the binary abandon in-flight intervals, whose retry waits can last
//! up to the retry deadline.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

/// Shared handle to a shutdown coordinator.
pub type SharedShutdown = Arc<ShutdownCoordinator>;

static GLOBAL_SHUTDOWN: OnceCell<SharedShutdown> = OnceCell::new();

/// Register the process-wide handle picked up by controllers and orchestrators.
pub fn set_global_shutdown(handle: SharedShutdown) {
    let _ = GLOBAL_SHUTDOWN.set(handle);
}

/// Process-wide handle, if one was registered.
pub fn get_global_shutdown() -> Option<SharedShutdown> {
    GLOBAL_SHUTDOWN.get().cloned()
}

/// Cancellation flag for a run, checked before each interval starts
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    requests: AtomicU32,
    notify: Notify,
}

impl ShutdownCoordinator {
    /// Create a coordinator with no request recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new shared coordinator wrapped in [`Arc`].
    pub fn shared() -> SharedShutdown {
        Arc::new(Self::new())
    }

    /// Record a shutdown request and return how many have been made so far.
    ///
    /// Waiters are woken on the first request only.
    pub fn request_shutdown(&self) -> u32 {
        let count = self.requests.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        if count == 1 {
            self.notify.notify_waiters();
        }
        debug!(requests = count, "Shutdown requested");
        count
    }

    /// Whether any shutdown request has been made.
    pub fn is_shutdown_requested(&self) -> bool {
        self.request_count() > 0
    }

    /// Number of shutdown requests made so far.
    pub fn request_count(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Wait until shutdown is requested. Returns immediately if already set.
    pub async fn wait_for_shutdown(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a request in between is not lost
        notified.as_mut().enable();
        if self.is_shutdown_requested() {
            return;
        }
        notified.await;
    }
}
