use uuid::Uuid;

/// A request to crawl (or re-crawl) one URL.
///
/// Jobs are never persisted; each one is consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    pub url: String,
    /// Identifier of an existing crawl result to refresh, if any.
    pub result_id: Option<Uuid>,
}

impl CrawlJob {
    /// Crawl a URL into a brand new result record.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            result_id: None,
        }
    }

    /// Refresh an existing result record.
    pub fn recrawl(result_id: Uuid, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            result_id: Some(result_id),
        }
    }

    pub fn is_recrawl(&self) -> bool {
        self.result_id.is_some()
    }
}
