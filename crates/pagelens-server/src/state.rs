use pagelens_client::ReqwestFetcher;
use pagelens_core::{CrawlerConfig, Dispatcher, DispatcherConfig, JobSubmitter, PageCrawler};
use pagelens_db::{CrawlResultRepository, Database};

/// The dispatcher the server runs: Postgres-backed, crawling over reqwest.
pub type CrawlDispatcher = Dispatcher<CrawlResultRepository, ReqwestFetcher, ReqwestFetcher>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    pub api_key: String,
    /// Producer side of the crawl dispatcher's intake queue.
    pub jobs: JobSubmitter,
}

/// Wire a dispatcher whose workers persist into `db`.
///
/// The dispatcher is returned unstarted.
pub fn crawl_dispatcher(
    db: &Database,
    fetcher: ReqwestFetcher,
    dispatcher: DispatcherConfig,
    crawler: CrawlerConfig,
) -> CrawlDispatcher {
    let crawler = PageCrawler::with_config(fetcher.clone(), fetcher, crawler);
    Dispatcher::new(dispatcher, db.result_repo(), crawler)
}
