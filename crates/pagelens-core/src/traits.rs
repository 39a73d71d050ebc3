use std::future::Future;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::CrawlResult;

/// Downloads a page body with a single GET request.
///
/// A non-2xx response is not an error: its body is returned like any other.
/// Errors are reserved for transport failures.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Checks the health of a link, returning the HTTP status of a HEAD request.
pub trait LinkChecker: Send + Sync + Clone {
    fn check(&self, url: &str) -> impl Future<Output = Result<u16, AppError>> + Send;
}

/// Durable persistence for crawl results.
///
/// Implementations are shared by every worker and must serialize their own
/// writes; the core never writes the same record from two tasks at once.
pub trait ResultStore: Send + Sync + Clone {
    /// Insert a new record, ignoring its `id`. Returns the assigned identifier.
    fn create(&self, result: &CrawlResult) -> impl Future<Output = Result<Uuid, AppError>> + Send;

    /// Fetch a record, or [`AppError::NotFound`] if it does not exist.
    fn get(&self, id: Uuid) -> impl Future<Output = Result<CrawlResult, AppError>> + Send;

    /// Overwrite the stored record with the same `id`.
    fn update(&self, result: &CrawlResult) -> impl Future<Output = Result<(), AppError>> + Send;
}
