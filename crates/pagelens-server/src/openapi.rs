use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PageLens API",
        version = "0.1.0",
        description = "Queue web pages for crawling and inspect their structure: title, markup version, headings, links and login forms."
    ),
    paths(
        crate::routes::submit_url,
        crate::routes::list_urls,
        crate::routes::get_url,
        crate::routes::delete_urls,
        crate::routes::rerun_urls,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::SubmitUrlRequest,
        crate::dto::SubmitUrlResponse,
        crate::dto::IdsRequest,
        crate::dto::RerunResponse,
        crate::dto::DeleteResponse,
        crate::dto::BrokenLinkResponse,
        crate::dto::CrawlResultResponse,
        crate::dto::CrawlResultListResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "urls", description = "Crawl submission and results"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl utoipa::Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("API key from the PAGELENS_API_KEY environment variable."))
                        .build(),
                ),
            );
        }
    }
}
