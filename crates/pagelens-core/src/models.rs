use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a crawl result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Queued,
    Running,
    Completed,
    Error,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlStatus::Queued => "queued",
            CrawlStatus::Running => "running",
            CrawlStatus::Completed => "completed",
            CrawlStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CrawlStatus::Completed | CrawlStatus::Error)
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CrawlStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(CrawlStatus::Queued),
            "running" => Ok(CrawlStatus::Running),
            "completed" => Ok(CrawlStatus::Completed),
            "error" => Ok(CrawlStatus::Error),
            _ => Err(format!("Unknown crawl status: {}", s)),
        }
    }
}

/// A link whose health check answered with status >= 400.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLink {
    pub url: String,
    pub status_code: u16,
}

/// Heading tag (`h1`..`h6`) to number of occurrences.
pub type HeadingCounts = BTreeMap<String, u32>;

/// The persisted outcome of crawling one URL.
///
/// `inaccessible_links_count` always equals `broken_links.len()`; both are
/// written together by the crawler and cleared together by
/// [`reset_statistics`](Self::reset_statistics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Store-assigned identifier; nil until the record has been created.
    pub id: Uuid,
    pub url: String,
    pub status: CrawlStatus,
    pub page_title: String,
    pub html_version: String,
    pub headings: HeadingCounts,
    pub internal_links_count: u32,
    pub external_links_count: u32,
    pub inaccessible_links_count: u32,
    pub broken_links: Vec<BrokenLink>,
    pub has_login_form: bool,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CrawlResult {
    /// A fresh placeholder record waiting to be crawled.
    pub fn queued(url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            url: url.into(),
            status: CrawlStatus::Queued,
            page_title: String::new(),
            html_version: String::new(),
            headings: HeadingCounts::new(),
            internal_links_count: 0,
            external_links_count: 0,
            inaccessible_links_count: 0,
            broken_links: Vec::new(),
            has_login_form: false,
            error_message: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Clear every signal left over from a previous crawl.
    pub fn reset_statistics(&mut self) {
        self.page_title.clear();
        self.html_version.clear();
        self.has_login_form = false;
        self.headings.clear();
        self.internal_links_count = 0;
        self.external_links_count = 0;
        self.inaccessible_links_count = 0;
        self.broken_links.clear();
        self.error_message.clear();
    }

    pub fn mark_running(&mut self) {
        self.status = CrawlStatus::Running;
        self.reset_statistics();
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = CrawlStatus::Error;
        self.error_message = message.into();
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self) {
        self.status = CrawlStatus::Completed;
        self.error_message.clear();
        self.updated_at = Utc::now();
    }

    /// Replace the broken-link list, keeping the inaccessible count in step.
    pub fn set_broken_links(&mut self, broken: Vec<BrokenLink>) {
        self.inaccessible_links_count = broken.len() as u32;
        self.broken_links = broken;
    }
}
