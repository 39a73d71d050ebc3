use crate::error::AppError;

/// Worker pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Number of crawls allowed to run at the same time.
    pub workers: usize,
    /// Jobs buffered in the intake queue before `submit` starts waiting.
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 100,
        }
    }
}

impl DispatcherConfig {
    /// Read configuration from environment variables.
    ///
    /// - `PAGELENS_WORKERS` (optional, defaults to 5)
    /// - `PAGELENS_QUEUE_CAPACITY` (optional, defaults to 100)
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            workers: positive_from_env("PAGELENS_WORKERS", defaults.workers)?,
            queue_capacity: positive_from_env("PAGELENS_QUEUE_CAPACITY", defaults.queue_capacity)?,
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

/// Tuning for a single page crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlerConfig {
    /// Upper bound on link health checks in flight for one page.
    pub link_concurrency: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            link_concurrency: 32,
        }
    }
}

impl CrawlerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `PAGELENS_LINK_CONCURRENCY` (optional, defaults to 32)
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            link_concurrency: positive_from_env(
                "PAGELENS_LINK_CONCURRENCY",
                Self::default().link_concurrency,
            )?,
        })
    }

    pub fn with_link_concurrency(mut self, limit: usize) -> Self {
        self.link_concurrency = limit;
        self
    }
}

fn positive_from_env(name: &str, default: usize) -> Result<usize, AppError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => parse_positive(name, &raw),
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<usize, AppError> {
    let parsed: usize = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!(
            "Invalid {name} '{raw}': must be a positive integer"
        ))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{name} must be at least 1")));
    }
    Ok(parsed)
}
