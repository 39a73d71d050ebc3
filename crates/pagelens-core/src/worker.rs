use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::crawler::PageCrawler;
use crate::error::AppError;
use crate::job::CrawlJob;
use crate::models::{CrawlResult, CrawlStatus};
use crate::tracker::JobTracker;
use crate::traits::{Fetcher, LinkChecker, ResultStore};

/// A worker's private, single-use availability slot.
///
/// The dispatcher hands exactly one job into it. If the worker has stopped
/// in the meantime, `send` gives the job back.
pub type Slot = oneshot::Sender<CrawlJob>;

/// Events emitted by the worker for monitoring/logging.
#[derive(Debug, Clone)]
pub enum WorkerEvent<'a> {
    Started {
        worker: usize,
    },
    Idle {
        worker: usize,
    },
    JobReceived {
        worker: usize,
        job: &'a CrawlJob,
    },
    JobAbandoned {
        worker: usize,
        url: &'a str,
        error: &'a str,
    },
    JobFinished {
        worker: usize,
        result_id: Uuid,
        status: CrawlStatus,
    },
    Stopped {
        worker: usize,
    },
}

/// Trait for receiving worker events (decoupled logging).
pub trait WorkerReporter: Send + Sync {
    fn report(&self, event: WorkerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWorkerReporter;

impl WorkerReporter for TracingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        match event {
            WorkerEvent::Started { worker } => {
                tracing::info!(%worker, "Worker started");
            }
            WorkerEvent::Idle { worker } => {
                tracing::debug!(%worker, "Worker idle");
            }
            WorkerEvent::JobReceived { worker, job } => {
                tracing::info!(
                    %worker,
                    url = %job.url,
                    result_id = ?job.result_id,
                    recrawl = job.is_recrawl(),
                    "Processing job"
                );
            }
            WorkerEvent::JobAbandoned { worker, url, error } => {
                tracing::error!(%worker, %url, %error, "Job abandoned");
            }
            WorkerEvent::JobFinished {
                worker,
                result_id,
                status,
            } => {
                tracing::info!(%worker, %result_id, %status, "Job finished");
            }
            WorkerEvent::Stopped { worker } => {
                tracing::info!(%worker, "Worker stopped");
            }
        }
    }
}

/// Processes crawl jobs one at a time.
///
/// Each loop iteration registers a fresh [`Slot`] in the shared pool and
/// waits for a job or a stop signal. A stop signal is only honoured between
/// jobs; a crawl that has started always runs to completion.
pub struct Worker<S, F, L>
where
    S: ResultStore,
    F: Fetcher,
    L: LinkChecker,
{
    id: usize,
    store: S,
    crawler: Arc<PageCrawler<F, L>>,
    pool: mpsc::Sender<Slot>,
    tracker: JobTracker,
}

impl<S, F, L> Worker<S, F, L>
where
    S: ResultStore,
    F: Fetcher,
    L: LinkChecker,
{
    pub fn new(
        id: usize,
        store: S,
        crawler: Arc<PageCrawler<F, L>>,
        pool: mpsc::Sender<Slot>,
        tracker: JobTracker,
    ) -> Self {
        Self {
            id,
            store,
            crawler,
            pool,
            tracker,
        }
    }

    /// Run the worker loop until `stop` is cancelled or the dispatcher goes away.
    pub async fn run<WR: WorkerReporter + ?Sized>(self, stop: CancellationToken, reporter: &WR) {
        reporter.report(WorkerEvent::Started { worker: self.id });

        loop {
            let (slot, mut receiver) = oneshot::channel();

            tokio::select! {
                biased;
                () = stop.cancelled() => break,
                registered = self.pool.send(slot) => {
                    if registered.is_err() {
                        break;
                    }
                }
            }
            reporter.report(WorkerEvent::Idle { worker: self.id });

            let delivered = tokio::select! {
                biased;
                job = &mut receiver => job.ok(),
                () = stop.cancelled() => {
                    // A job may already be sitting in the slot; close it so
                    // nothing else can arrive, then take whatever is there.
                    receiver.close();
                    receiver.try_recv().ok()
                }
            };
            let Some(job) = delivered else {
                break;
            };

            self.process_job(&job, reporter).await;
            self.tracker.done();
        }

        reporter.report(WorkerEvent::Stopped { worker: self.id });
    }

    async fn process_job<WR: WorkerReporter + ?Sized>(&self, job: &CrawlJob, reporter: &WR) {
        reporter.report(WorkerEvent::JobReceived {
            worker: self.id,
            job,
        });

        let mut result = match self.load_or_create(job).await {
            Ok(result) => result,
            Err(e) => return self.abandon(job, &e, reporter),
        };

        result.mark_running();
        if let Err(e) = self.store.update(&result).await {
            return self.abandon(job, &e, reporter);
        }

        if let Err(e) = self.crawler.crawl(&mut result).await {
            tracing::warn!(result_id = %result.id, url = %result.url, error = %e, "Crawl failed");
        }

        result.updated_at = Utc::now();
        if let Err(e) = self.store.update(&result).await {
            return self.abandon(job, &e, reporter);
        }

        reporter.report(WorkerEvent::JobFinished {
            worker: self.id,
            result_id: result.id,
            status: result.status,
        });
    }

    async fn load_or_create(&self, job: &CrawlJob) -> Result<CrawlResult, AppError> {
        match job.result_id {
            Some(id) => self.store.get(id).await,
            None => {
                let mut result = CrawlResult::queued(job.url.clone());
                result.id = self.store.create(&result).await?;
                Ok(result)
            }
        }
    }

    fn abandon<WR: WorkerReporter + ?Sized>(&self, job: &CrawlJob, error: &AppError, reporter: &WR) {
        let error = error.to_string();
        reporter.report(WorkerEvent::JobAbandoned {
            worker: self.id,
            url: &job.url,
            error: &error,
        });
    }
}
