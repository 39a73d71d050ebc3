use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::DispatcherConfig;
use crate::crawler::PageCrawler;
use crate::error::AppError;
use crate::job::CrawlJob;
use crate::job_queue::{JobSubmitter, intake_queue};
use crate::tracker::JobTracker;
use crate::traits::{Fetcher, LinkChecker, ResultStore};
use crate::worker::{Slot, TracingWorkerReporter, Worker, WorkerReporter};

/// Routes crawl jobs from a bounded intake queue to a fixed pool of workers.
///
/// Idle workers announce themselves by registering a one-shot [`Slot`]; the
/// intake loop pairs each queued job with the next registered slot, so a job
/// is only taken off the queue once some worker is free to run it. Jobs are
/// handed out in submission order.
///
/// Several dispatchers can coexist; they share nothing unless given the same
/// store.
pub struct Dispatcher<S, F, L>
where
    S: ResultStore + 'static,
    F: Fetcher + 'static,
    L: LinkChecker + 'static,
{
    config: DispatcherConfig,
    store: S,
    crawler: Arc<PageCrawler<F, L>>,
    tracker: JobTracker,
    submitter: JobSubmitter,
    intake: Option<mpsc::Receiver<CrawlJob>>,
    shutdown: CancellationToken,
    worker_tokens: Vec<CancellationToken>,
    tasks: TaskTracker,
}

impl<S, F, L> Dispatcher<S, F, L>
where
    S: ResultStore + 'static,
    F: Fetcher + 'static,
    L: LinkChecker + 'static,
{
    pub fn new(config: DispatcherConfig, store: S, crawler: PageCrawler<F, L>) -> Self {
        let tracker = JobTracker::new();
        let (submitter, intake) = intake_queue(config.queue_capacity, tracker.clone());
        Self {
            config,
            store,
            crawler: Arc::new(crawler),
            tracker,
            submitter,
            intake: Some(intake),
            shutdown: CancellationToken::new(),
            worker_tokens: Vec::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Spawn the workers and the intake loop, logging worker events via `tracing`.
    pub fn start(&mut self) -> Result<(), AppError> {
        self.start_with_reporter(Arc::new(TracingWorkerReporter))
    }

    pub fn start_with_reporter<WR>(&mut self, reporter: Arc<WR>) -> Result<(), AppError>
    where
        WR: WorkerReporter + 'static,
    {
        let Some(intake) = self.intake.take() else {
            return Err(AppError::Generic("dispatcher already started".into()));
        };

        let workers = self.config.workers.max(1);
        let (pool_tx, pool_rx) = mpsc::channel::<Slot>(workers);

        for id in 0..workers {
            let token = self.shutdown.child_token();
            self.worker_tokens.push(token.clone());

            let worker = Worker::new(
                id,
                self.store.clone(),
                Arc::clone(&self.crawler),
                pool_tx.clone(),
                self.tracker.clone(),
            );
            let reporter = Arc::clone(&reporter);
            self.tasks
                .spawn(async move { worker.run(token, reporter.as_ref()).await });
        }
        drop(pool_tx);

        self.tasks.spawn(intake_loop(
            intake,
            pool_rx,
            self.tracker.clone(),
            self.shutdown.clone(),
        ));

        tracing::info!(workers, queue_capacity = self.config.queue_capacity, "Dispatcher started");
        Ok(())
    }

    /// A cloneable handle for enqueueing jobs from other tasks.
    pub fn submitter(&self) -> JobSubmitter {
        self.submitter.clone()
    }

    pub async fn submit(&self, job: CrawlJob) -> Result<(), AppError> {
        self.submitter.submit(job).await
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    pub fn worker_count(&self) -> usize {
        self.worker_tokens.len()
    }

    /// Ask one worker to stop once it finishes its current job.
    ///
    /// Returns `false` if no worker has that index.
    pub fn stop_worker(&self, index: usize) -> bool {
        match self.worker_tokens.get(index) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop accepting jobs and wait for every task to exit.
    ///
    /// Crawls already handed to a worker run to completion; jobs still waiting
    /// in the intake queue are abandoned and released from the tracker.
    pub async fn shutdown(mut self) {
        tracing::info!(pending = self.tracker.pending(), "Dispatcher shutting down");
        self.shutdown.cancel();

        if let Some(intake) = self.intake.take() {
            abandon_queued(intake, &self.tracker);
        }

        self.tasks.close();
        self.tasks.wait().await;
        tracing::info!("Dispatcher stopped");
    }
}

/// Pair each queued job with the next free worker.
async fn intake_loop(
    mut intake: mpsc::Receiver<CrawlJob>,
    mut pool: mpsc::Receiver<Slot>,
    tracker: JobTracker,
    shutdown: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            job = intake.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        if let Err(job) = hand_off(job, &mut pool, &shutdown).await {
            tracing::warn!(url = %job.url, "No worker available, dropping job");
            tracker.done();
            break;
        }
    }

    abandon_queued(intake, &tracker);
}

/// Deliver `job` to a live worker, skipping slots whose worker has stopped.
///
/// Gives the job back if every worker is gone or the dispatcher is stopping.
async fn hand_off(
    mut job: CrawlJob,
    pool: &mut mpsc::Receiver<Slot>,
    shutdown: &CancellationToken,
) -> Result<(), CrawlJob> {
    loop {
        let slot = tokio::select! {
            biased;
            () = shutdown.cancelled() => None,
            slot = pool.recv() => slot,
        };
        let Some(slot) = slot else {
            return Err(job);
        };
        match slot.send(job) {
            Ok(()) => return Ok(()),
            Err(returned) => {
                tracing::debug!(url = %returned.url, "Worker slot closed, retrying");
                job = returned;
            }
        }
    }
}

fn abandon_queued(mut intake: mpsc::Receiver<CrawlJob>, tracker: &JobTracker) {
    intake.close();
    while let Ok(job) = intake.try_recv() {
        tracing::warn!(url = %job.url, "Dispatcher stopped, job abandoned");
        tracker.done();
    }
}
