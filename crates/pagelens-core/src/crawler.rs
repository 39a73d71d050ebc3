use futures::stream::{self, StreamExt};
use url::Url;

use crate::config::CrawlerConfig;
use crate::error::AppError;
use crate::extract::{PageSignals, extract_signals, parse_document};
use crate::models::{BrokenLink, CrawlResult};
use crate::traits::{Fetcher, LinkChecker};
use crate::version::detect_html_version;

/// Crawls a single page: fetch → detect version → parse → extract → check links.
///
/// Generic over the HTTP collaborators so the whole pipeline can be exercised
/// without a network.
pub struct PageCrawler<F, L>
where
    F: Fetcher,
    L: LinkChecker,
{
    fetcher: F,
    checker: L,
    config: CrawlerConfig,
}

impl<F, L> PageCrawler<F, L>
where
    F: Fetcher,
    L: LinkChecker,
{
    pub fn new(fetcher: F, checker: L) -> Self {
        Self::with_config(fetcher, checker, CrawlerConfig::default())
    }

    pub fn with_config(fetcher: F, checker: L, config: CrawlerConfig) -> Self {
        Self {
            fetcher,
            checker,
            config,
        }
    }

    /// Crawl `result.url` and write the extracted signals into `result`.
    ///
    /// Only a failed page fetch is fatal: the record is marked `error` with
    /// the cause and the error is returned. Individual link checks never
    /// abort the crawl. On success the record is marked `completed` and every
    /// countable field is replaced by this crawl's values.
    pub async fn crawl(&self, result: &mut CrawlResult) -> Result<(), AppError> {
        let base = match Url::parse(&result.url) {
            Ok(base) => base,
            Err(e) => {
                let err = AppError::HttpError(format!("Invalid URL '{}': {e}", result.url));
                result.mark_failed(err.to_string());
                return Err(err);
            }
        };

        tracing::info!(url = %result.url, "Fetching page");
        let body = match self.fetcher.fetch(&result.url).await {
            Ok(body) => body,
            Err(e) => {
                result.mark_failed(e.to_string());
                return Err(e);
            }
        };
        tracing::debug!(url = %result.url, bytes = body.len(), "Fetched page");

        result.html_version = detect_html_version(&body).to_string();
        let signals = analyze(&body, &base);

        let PageSignals {
            title,
            headings,
            internal_links,
            external_links,
            links,
            has_login_form,
        } = signals;

        let broken = self.check_links(links).await;

        result.page_title = title;
        result.headings = headings;
        result.internal_links_count = internal_links;
        result.external_links_count = external_links;
        result.has_login_form = has_login_form;
        result.set_broken_links(broken);
        result.mark_completed();

        tracing::info!(
            url = %result.url,
            internal = result.internal_links_count,
            external = result.external_links_count,
            broken = result.inaccessible_links_count,
            "Crawl complete"
        );
        Ok(())
    }

    /// HEAD every link with at most `link_concurrency` requests in flight.
    ///
    /// Resolves only after every check has finished. Links that fail at the
    /// transport level are neither broken nor healthy and are dropped.
    async fn check_links(&self, links: Vec<String>) -> Vec<BrokenLink> {
        tracing::debug!(links = links.len(), "Checking links");

        let checker = self.checker.clone();
        stream::iter(links)
            .map(move |link| {
                let checker = checker.clone();
                async move {
                    match checker.check(&link).await {
                        Ok(status_code) if status_code >= 400 => Some(BrokenLink {
                            url: link,
                            status_code,
                        }),
                        Ok(_) => None,
                        Err(e) => {
                            tracing::debug!(%link, error = %e, "Link check failed, ignoring");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.config.link_concurrency.max(1))
            .filter_map(std::future::ready)
            .collect()
            .await
    }
}

/// Parse and walk the document in one synchronous step.
///
/// The parsed tree is not `Send`, so it must be dropped before the crawl
/// awaits anything else.
fn analyze(body: &str, base: &Url) -> PageSignals {
    let document = parse_document(body);
    extract_signals(&document, base)
}
