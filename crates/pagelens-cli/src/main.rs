use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use pagelens_client::ReqwestFetcher;
use pagelens_core::models::{CrawlResult, CrawlStatus};
use pagelens_core::{
    CrawlJob, CrawlerConfig, Dispatcher, DispatcherConfig, MemoryStore, PageCrawler, ResultStore,
};
use pagelens_db::{CrawlResultRepository, Database, DatabaseConfig, ListParams, ListSort};

#[derive(Parser)]
#[command(name = "pagelens", version, about = "Crawl web pages and report their structure")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl one or more pages and print what was found
    Crawl {
        /// Pages to crawl
        #[arg(required = true)]
        urls: Vec<String>,

        /// Number of pages crawled at the same time
        #[arg(short, long, env = "PAGELENS_WORKERS", default_value_t = 5)]
        workers: usize,

        /// Link checks in flight per page
        #[arg(long, env = "PAGELENS_LINK_CONCURRENCY", default_value_t = 32)]
        link_concurrency: usize,

        /// Per-request timeout in seconds
        #[arg(long, env = "PAGELENS_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
        timeout: u64,

        /// Persist results to the database (requires DATABASE_URL)
        #[arg(long, default_value_t = false)]
        save: bool,

        /// Print results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List stored crawl results
    List {
        /// Number of results to show
        #[arg(short, long, default_value_t = 10)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Sort column, prefix with '-' for descending
        #[arg(short, long, default_value = "-created_at")]
        sort: String,

        /// Only show URLs containing this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Print results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show one stored crawl result
    Show {
        id: Uuid,

        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pagelens=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            urls,
            workers,
            link_concurrency,
            timeout,
            save,
            json,
        } => {
            let dispatcher = DispatcherConfig::default()
                .with_workers(workers)
                .with_queue_capacity(urls.len());
            let crawler = CrawlerConfig::default().with_link_concurrency(link_concurrency);
            let fetcher = ReqwestFetcher::with_timeout(Duration::from_secs(timeout))
                .context("Failed to create HTTP client")?
                .allow_private_urls();

            let results = if save {
                let repo = connect_db().await?;
                cmd_crawl(repo, fetcher, &urls, dispatcher, crawler).await?
            } else {
                cmd_crawl(MemoryStore::new(), fetcher, &urls, dispatcher, crawler).await?
            };
            print_results(&results, json)?;
        }
        Commands::List {
            limit,
            offset,
            sort,
            filter,
            json,
        } => {
            let sort: ListSort = sort.parse().map_err(anyhow::Error::msg)?;
            let params = ListParams {
                limit,
                offset,
                sort,
                filter,
            };
            let repo = connect_db().await?;
            cmd_list(&repo, &params, json).await?;
        }
        Commands::Show { id, json } => {
            let repo = connect_db().await?;
            let result = repo.get(id).await?;
            print_results(std::slice::from_ref(&result), json)?;
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL and apply migrations.
async fn connect_db() -> Result<CrawlResultRepository> {
    let config = DatabaseConfig::from_env()?;
    let db = Database::open(&config)
        .await
        .context("Failed to open database")?;
    Ok(db.result_repo())
}

/// Crawl every URL through a local dispatcher and return the final records
/// in the order the URLs were given.
async fn cmd_crawl<S>(
    store: S,
    fetcher: ReqwestFetcher,
    urls: &[String],
    dispatcher: DispatcherConfig,
    crawler: CrawlerConfig,
) -> Result<Vec<CrawlResult>>
where
    S: ResultStore + 'static,
{
    let crawler = PageCrawler::with_config(fetcher.clone(), fetcher, crawler);
    let mut dispatcher = Dispatcher::new(dispatcher, store.clone(), crawler);
    dispatcher.start()?;

    let mut ids = Vec::with_capacity(urls.len());
    for url in urls {
        let id = store.create(&CrawlResult::queued(url.as_str())).await?;
        dispatcher.submit(CrawlJob::recrawl(id, url.as_str())).await?;
        ids.push(id);
    }

    tracing::info!(pages = ids.len(), "Waiting for crawls to finish");
    dispatcher.tracker().wait_idle().await;
    dispatcher.shutdown().await;

    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        results.push(store.get(id).await?);
    }
    Ok(results)
}

async fn cmd_list(repo: &CrawlResultRepository, params: &ListParams, json: bool) -> Result<()> {
    let results = repo.list(params).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No crawl results found");
        return Ok(());
    }

    for r in &results {
        println!(
            "{}  {:<9}  {}  {}",
            r.id,
            r.status.as_str(),
            r.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            r.url,
        );
    }
    println!("\nShowing {} result(s) from offset {}", results.len(), params.offset);
    Ok(())
}

fn print_results(results: &[CrawlResult], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    for (i, r) in results.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", render_summary(r));
    }
    Ok(())
}

fn render_summary(r: &CrawlResult) -> String {
    let mut out = format!("{} [{}]\n", r.url, r.status);
    if r.status == CrawlStatus::Error {
        out.push_str(&format!("  error: {}\n", r.error_message));
        return out;
    }

    let title = if r.page_title.is_empty() {
        "(none)"
    } else {
        &r.page_title
    };
    out.push_str(&format!("  title: {title}\n"));
    out.push_str(&format!("  html version: {}\n", r.html_version));

    let headings: Vec<String> = r
        .headings
        .iter()
        .map(|(tag, count)| format!("{tag}={count}"))
        .collect();
    if !headings.is_empty() {
        out.push_str(&format!("  headings: {}\n", headings.join(" ")));
    }
    out.push_str(&format!(
        "  links: {} internal, {} external, {} inaccessible\n",
        r.internal_links_count, r.external_links_count, r.inaccessible_links_count
    ));
    for broken in &r.broken_links {
        out.push_str(&format!("    {} {}\n", broken.status_code, broken.url));
    }
    out.push_str(&format!(
        "  login form: {}\n",
        if r.has_login_form { "yes" } else { "no" }
    ));
    out
}
