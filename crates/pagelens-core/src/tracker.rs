use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Join counter for crawl jobs.
///
/// Incremented once for every accepted job and decremented once when that
/// job completes or is abandoned, so a caller can wait until the pool has
/// drained. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct JobTracker {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    idle: Notify,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self) {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub fn done(&self) {
        let previous = self
            .inner
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match previous {
            Ok(1) => self.inner.idle.notify_waiters(),
            Ok(_) => {}
            Err(_) => tracing::warn!("JobTracker::done called with no pending jobs"),
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Wait until no accepted job is pending.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}
