pub mod config;
pub mod crawler;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod job;
pub mod job_queue;
pub mod links;
pub mod models;
pub mod store;
pub mod tracker;
pub mod traits;
pub mod version;
pub mod worker;

#[cfg(test)]
mod testutil;

pub use config::{CrawlerConfig, DispatcherConfig};
pub use crawler::PageCrawler;
pub use dispatcher::Dispatcher;
pub use error::AppError;
pub use job::CrawlJob;
pub use job_queue::JobSubmitter;
pub use models::{BrokenLink, CrawlResult, CrawlStatus, HeadingCounts};
pub use store::MemoryStore;
pub use tracker::JobTracker;
pub use traits::{Fetcher, LinkChecker, ResultStore};
pub use worker::{TracingWorkerReporter, WorkerEvent, WorkerReporter};
