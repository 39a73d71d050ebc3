use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pagelens_core::models::{BrokenLink, CrawlResult};

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmitUrlRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SubmitUrlResponse {
    pub id: Uuid,
    pub status: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct IdsRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RerunResponse {
    pub submitted: usize,
    /// Requested ids with no stored result.
    pub missing: Vec<Uuid>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    pub deleted: u64,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListUrlsQuery {
    /// Page size, 1 to 100 (default 10).
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Column to order by; prefix with `-` for descending (default `created_at`).
    pub sort_by: Option<String>,
    /// Case-insensitive URL substring.
    pub filter: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BrokenLinkResponse {
    pub url: String,
    pub status_code: u16,
}

impl From<BrokenLink> for BrokenLinkResponse {
    fn from(link: BrokenLink) -> Self {
        Self {
            url: link.url,
            status_code: link.status_code,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CrawlResultResponse {
    pub id: Uuid,
    pub url: String,
    pub status: String,
    pub page_title: String,
    pub html_version: String,
    pub headings: BTreeMap<String, u32>,
    pub internal_links_count: u32,
    pub external_links_count: u32,
    pub inaccessible_links_count: u32,
    pub broken_links: Vec<BrokenLinkResponse>,
    pub has_login_form: bool,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CrawlResult> for CrawlResultResponse {
    fn from(r: CrawlResult) -> Self {
        Self {
            id: r.id,
            url: r.url,
            status: r.status.to_string(),
            page_title: r.page_title,
            html_version: r.html_version,
            headings: r.headings,
            internal_links_count: r.internal_links_count,
            external_links_count: r.external_links_count,
            inaccessible_links_count: r.inaccessible_links_count,
            broken_links: r.broken_links.into_iter().map(Into::into).collect(),
            has_login_form: r.has_login_form,
            error_message: r.error_message,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CrawlResultListResponse {
    pub results: Vec<CrawlResultResponse>,
    pub limit: u32,
    pub offset: u32,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    /// Crawl jobs accepted but not yet finished.
    pub pending_jobs: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
