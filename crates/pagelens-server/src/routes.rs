use std::collections::HashSet;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::map_request_body::MapRequestBodyLayer;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use pagelens_core::models::{CrawlResult, CrawlStatus};
use pagelens_core::{AppError, CrawlJob};
use pagelens_db::{ListParams, ListSort};

use crate::auth::require_api_key;
use crate::dto::{
    CrawlResultListResponse, CrawlResultResponse, DeleteResponse, HealthResponse, IdsRequest,
    ListUrlsQuery, RerunResponse, SubmitUrlRequest, SubmitUrlResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/v1/urls", post(submit_url).get(list_urls).delete(delete_urls))
        .route("/v1/urls/rerun", post(rerun_urls))
        .route("/v1/urls/{id}", get(get_url))
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(MapRequestBodyLayer::new(axum::body::Body::new))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    require_api_key,
                )),
        );

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/urls",
    request_body = SubmitUrlRequest,
    responses(
        (status = 202, description = "URL queued for crawling", body = SubmitUrlResponse),
        (status = 400, description = "Not an absolute http(s) URL", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "urls"
)]
pub async fn submit_url(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<SubmitUrlRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let url = validate_crawl_url(&body.url)?;

    let mut record = CrawlResult::queued(url.as_str());
    record.id = state.db.result_repo().create(&record).await?;
    state
        .jobs
        .submit(CrawlJob::recrawl(record.id, url.as_str()))
        .await?;

    tracing::info!(result_id = %record.id, %url, "URL queued");
    let response = SubmitUrlResponse {
        id: record.id,
        status: CrawlStatus::Queued.to_string(),
    };
    Ok((StatusCode::ACCEPTED, axum::Json(response)))
}

#[utoipa::path(
    get,
    path = "/v1/urls",
    params(ListUrlsQuery),
    responses(
        (status = 200, description = "Page of crawl results", body = CrawlResultListResponse),
        (status = 400, description = "Unknown sort column", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "urls"
)]
pub async fn list_urls(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUrlsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = list_params(query)?;
    let results = state.db.result_repo().list(&params).await?;

    let response = CrawlResultListResponse {
        results: results.into_iter().map(CrawlResultResponse::from).collect(),
        limit: params.limit,
        offset: params.offset,
    };
    Ok(axum::Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/urls/{id}",
    params(
        ("id" = Uuid, Path, description = "Crawl result ID")
    ),
    responses(
        (status = 200, description = "Crawl result", body = CrawlResultResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "urls"
)]
pub async fn get_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.db.result_repo().get(id).await?;
    Ok(axum::Json(CrawlResultResponse::from(result)))
}

#[utoipa::path(
    delete,
    path = "/v1/urls",
    request_body = IdsRequest,
    responses(
        (status = 200, description = "Results deleted", body = DeleteResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "urls"
)]
pub async fn delete_urls(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<IdsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.db.result_repo().delete_many(&body.ids).await?;
    Ok(axum::Json(DeleteResponse { deleted }))
}

#[utoipa::path(
    post,
    path = "/v1/urls/rerun",
    request_body = IdsRequest,
    responses(
        (status = 202, description = "Re-crawls queued", body = RerunResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "urls"
)]
pub async fn rerun_urls(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<IdsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = state.db.result_repo();
    let mut submitted = 0;
    let mut missing = Vec::new();

    for id in unique_ids(body.ids) {
        match repo.get(id).await {
            Ok(record) => {
                state.jobs.submit(CrawlJob::recrawl(id, record.url)).await?;
                submitted += 1;
            }
            Err(AppError::NotFound(_)) => {
                tracing::debug!(result_id = %id, "Skipping re-run of unknown result");
                missing.push(id);
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(submitted, missing = missing.len(), "Re-crawl requested");
    Ok((
        StatusCode::ACCEPTED,
        axum::Json(RerunResponse { submitted, missing }),
    ))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let healthy = state.db.result_repo().health_check().await.is_ok();

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        database: if healthy { "ok" } else { "error" },
        pending_jobs: state.jobs.tracker().pending(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, axum::Json(response))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_crawl_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::BadRequest(format!(
            "URL scheme '{}' is not allowed (only http/https)",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ApiError::BadRequest(format!("URL '{raw}' has no host")));
    }
    Ok(url)
}

/// Drop repeated ids, keeping first-seen order, so one request never queues
/// two concurrent crawls of the same record.
fn unique_ids(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn list_params(query: ListUrlsQuery) -> Result<ListParams, ApiError> {
    let sort = match query.sort_by.as_deref() {
        Some(raw) => raw.parse::<ListSort>().map_err(ApiError::BadRequest)?,
        None => ListSort::default(),
    };
    Ok(ListParams {
        limit: query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE),
        offset: query.offset.unwrap_or(0),
        sort,
        filter: query.filter.filter(|f| !f.is_empty()),
    })
}
