use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pagelens_core::error::AppError;
use pagelens_core::models::{BrokenLink, CrawlResult, CrawlStatus, HeadingCounts};
use pagelens_core::traits::ResultStore;
use sqlx::types::Json;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

const COLUMNS: &str = "id, url, status, page_title, html_version, headings, \
    internal_links_count, external_links_count, inaccessible_links_count, \
    broken_links, has_login_form, error_message, created_at, updated_at";

/// Columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Url,
    Status,
    PageTitle,
    HtmlVersion,
    InternalLinks,
    ExternalLinks,
    InaccessibleLinks,
    CreatedAt,
    UpdatedAt,
}

impl SortColumn {
    pub const ALL: [SortColumn; 9] = [
        SortColumn::Url,
        SortColumn::Status,
        SortColumn::PageTitle,
        SortColumn::HtmlVersion,
        SortColumn::InternalLinks,
        SortColumn::ExternalLinks,
        SortColumn::InaccessibleLinks,
        SortColumn::CreatedAt,
        SortColumn::UpdatedAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Url => "url",
            SortColumn::Status => "status",
            SortColumn::PageTitle => "page_title",
            SortColumn::HtmlVersion => "html_version",
            SortColumn::InternalLinks => "internal_links_count",
            SortColumn::ExternalLinks => "external_links_count",
            SortColumn::InaccessibleLinks => "inaccessible_links_count",
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
        }
    }
}

/// Ordering for [`CrawlResultRepository::list`].
///
/// Parsed from a column name, optionally prefixed with `-` for descending
/// order (`"-created_at"`). Only the columns in [`SortColumn`] are accepted,
/// so the value can be spliced into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSort {
    pub column: SortColumn,
    pub descending: bool,
}

impl Default for ListSort {
    fn default() -> Self {
        Self {
            column: SortColumn::CreatedAt,
            descending: false,
        }
    }
}

impl ListSort {
    fn order_by(&self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!("{} {direction}, id ASC", self.column.as_str())
    }
}

impl FromStr for ListSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, descending) = match s.strip_prefix('-') {
            Some(name) => (name, true),
            None => (s, false),
        };
        SortColumn::ALL
            .into_iter()
            .find(|column| column.as_str() == name)
            .map(|column| ListSort { column, descending })
            .ok_or_else(|| {
                let allowed: Vec<&str> = SortColumn::ALL.iter().map(|c| c.as_str()).collect();
                format!("Unknown sort column '{name}' (allowed: {})", allowed.join(", "))
            })
    }
}

impl fmt::Display for ListSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-")?;
        }
        f.write_str(self.column.as_str())
    }
}

/// Paging, ordering and URL filter for a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub limit: u32,
    pub offset: u32,
    pub sort: ListSort,
    /// Case-insensitive substring the URL must contain.
    pub filter: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            sort: ListSort::default(),
            filter: None,
        }
    }
}

/// PostgreSQL persistence for crawl results.
#[derive(Clone)]
pub struct CrawlResultRepository {
    pool: Pool<Postgres>,
}

impl CrawlResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a record and return the id assigned by the database.
    pub async fn create(&self, result: &CrawlResult) -> Result<Uuid, AppError> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO crawl_results (
                url, status, page_title, html_version, headings,
                internal_links_count, external_links_count, inaccessible_links_count,
                broken_links, has_login_form, error_message, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(&result.url)
        .bind(result.status.as_str())
        .bind(&result.page_title)
        .bind(&result.html_version)
        .bind(Json(&result.headings))
        .bind(i64::from(result.internal_links_count))
        .bind(i64::from(result.external_links_count))
        .bind(i64::from(result.inaccessible_links_count))
        .bind(Json(&result.broken_links))
        .bind(result.has_login_form)
        .bind(&result.error_message)
        .bind(result.created_at)
        .bind(result.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tracing::debug!(result_id = %row.0, url = %result.url, "Crawl result created");
        Ok(row.0)
    }

    pub async fn get(&self, id: Uuid) -> Result<CrawlResult, AppError> {
        let query = format!("SELECT {COLUMNS} FROM crawl_results WHERE id = $1");
        let row = sqlx::query_as::<_, CrawlResultRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        match row {
            Some(row) => row.try_into(),
            None => Err(AppError::NotFound(format!("crawl result {id}"))),
        }
    }

    /// Overwrite every mutable column of the record with the same id.
    pub async fn update(&self, result: &CrawlResult) -> Result<(), AppError> {
        let outcome = sqlx::query(
            r#"
            UPDATE crawl_results
            SET url = $2,
                status = $3,
                page_title = $4,
                html_version = $5,
                headings = $6,
                internal_links_count = $7,
                external_links_count = $8,
                inaccessible_links_count = $9,
                broken_links = $10,
                has_login_form = $11,
                error_message = $12,
                updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(result.id)
        .bind(&result.url)
        .bind(result.status.as_str())
        .bind(&result.page_title)
        .bind(&result.html_version)
        .bind(Json(&result.headings))
        .bind(i64::from(result.internal_links_count))
        .bind(i64::from(result.external_links_count))
        .bind(i64::from(result.inaccessible_links_count))
        .bind(Json(&result.broken_links))
        .bind(result.has_login_form)
        .bind(&result.error_message)
        .bind(result.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        if outcome.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("crawl result {}", result.id)));
        }
        Ok(())
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<CrawlResult>, AppError> {
        let query = format!(
            "SELECT {COLUMNS} FROM crawl_results WHERE url ILIKE $1 ORDER BY {} LIMIT $2 OFFSET $3",
            params.sort.order_by()
        );
        let pattern = like_pattern(params.filter.as_deref().unwrap_or_default());

        let rows = sqlx::query_as::<_, CrawlResultRow>(&query)
            .bind(pattern)
            .bind(i64::from(params.limit))
            .bind(i64::from(params.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(CrawlResult::try_from).collect()
    }

    /// Delete the given records. Unknown ids are ignored.
    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let outcome = sqlx::query("DELETE FROM crawl_results WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tracing::info!(requested = ids.len(), deleted = outcome.rows_affected(), "Crawl results deleted");
        Ok(outcome.rows_affected())
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

/// `%filter%` with LIKE metacharacters escaped.
fn like_pattern(filter: &str) -> String {
    let mut pattern = String::with_capacity(filter.len() + 2);
    pattern.push('%');
    for c in filter.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct CrawlResultRow {
    id: Uuid,
    url: String,
    status: String,
    page_title: String,
    html_version: String,
    headings: Json<HeadingCounts>,
    internal_links_count: i64,
    external_links_count: i64,
    inaccessible_links_count: i64,
    broken_links: Json<Vec<BrokenLink>>,
    has_login_form: bool,
    error_message: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CrawlResultRow> for CrawlResult {
    type Error = AppError;

    fn try_from(row: CrawlResultRow) -> Result<Self, Self::Error> {
        let status: CrawlStatus = row
            .status
            .parse()
            .map_err(|e: String| AppError::DatabaseError(format!("Row {}: {e}", row.id)))?;

        Ok(CrawlResult {
            id: row.id,
            url: row.url,
            status,
            page_title: row.page_title,
            html_version: row.html_version,
            headings: row.headings.0,
            internal_links_count: count(row.internal_links_count),
            external_links_count: count(row.external_links_count),
            inaccessible_links_count: count(row.inaccessible_links_count),
            broken_links: row.broken_links.0,
            has_login_form: row.has_login_form,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn count(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

// -- Trait implementation --

impl ResultStore for CrawlResultRepository {
    async fn create(&self, result: &CrawlResult) -> Result<Uuid, AppError> {
        CrawlResultRepository::create(self, result).await
    }

    async fn get(&self, id: Uuid) -> Result<CrawlResult, AppError> {
        CrawlResultRepository::get(self, id).await
    }

    async fn update(&self, result: &CrawlResult) -> Result<(), AppError> {
        CrawlResultRepository::update(self, result).await
    }
}
