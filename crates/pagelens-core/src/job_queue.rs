use tokio::sync::mpsc;

use crate::error::AppError;
use crate::job::CrawlJob;
use crate::tracker::JobTracker;

/// Create a bounded intake queue for crawl jobs.
///
/// The receiving half belongs to exactly one dispatcher; the submitter can be
/// cloned and handed to any number of producers.
pub fn intake_queue(capacity: usize, tracker: JobTracker) -> (JobSubmitter, mpsc::Receiver<CrawlJob>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (JobSubmitter { tx, tracker }, rx)
}

/// Producer handle for a dispatcher's intake queue.
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    tx: mpsc::Sender<CrawlJob>,
    tracker: JobTracker,
}

impl JobSubmitter {
    /// Enqueue a job, waiting for space if the queue is full.
    ///
    /// Jobs are never dropped for lack of room; the caller is suspended
    /// instead. Fails only once the dispatcher has shut down. Cancel-safe:
    /// the job is only counted once a queue slot has been reserved.
    pub async fn submit(&self, job: CrawlJob) -> Result<(), AppError> {
        let permit = self.tx.reserve().await.map_err(|_| {
            AppError::Generic(format!(
                "dispatcher is shut down, cannot crawl {}",
                job.url
            ))
        })?;
        self.tracker.add();
        permit.send(job);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }
}
