use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pagelens_client::ReqwestFetcher;
use pagelens_core::{CrawlerConfig, DispatcherConfig};
use pagelens_db::{Database, DatabaseConfig};
use pagelens_server::config::ServerConfig;
use pagelens_server::routes;
use pagelens_server::state::{AppState, crawl_dispatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pagelens=info".parse()?))
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let addr = format!("0.0.0.0:{}", config.port);

    let db = Database::open(&DatabaseConfig::from_env()?).await?;

    let mut fetcher = ReqwestFetcher::with_timeout(config.request_timeout)?;
    if config.allow_private_urls {
        tracing::warn!("Private network addresses may be crawled");
        fetcher = fetcher.allow_private_urls();
    }
    let mut dispatcher = crawl_dispatcher(
        &db,
        fetcher,
        DispatcherConfig::from_env()?,
        CrawlerConfig::from_env()?,
    );
    dispatcher.start()?;

    let state = Arc::new(AppState {
        db,
        api_key: config.api_key,
        jobs: dispatcher.submitter(),
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dispatcher.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
