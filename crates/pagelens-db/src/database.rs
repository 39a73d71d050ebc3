use std::time::Duration;

use pagelens_core::AppError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;
use crate::repository::CrawlResultRepository;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pool handle for the crawl result database.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        tracing::debug!(max_connections = config.max_connections, "Database pool ready");
        Ok(Self { pool })
    }

    /// Connect and bring the schema up to date in one step.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, AppError> {
        let db = Self::connect(config).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Wrap a pool created elsewhere (test containers use this).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        let migrator = sqlx::migrate!("../../migrations");
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        tracing::debug!(migrations = migrator.iter().count(), "Schema up to date");
        Ok(())
    }

    pub fn result_repo(&self) -> CrawlResultRepository {
        CrawlResultRepository::new(self.pool.clone())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
