use pagelens_core::AppError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection settings for the crawl result database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Read configuration from environment variables.
    ///
    /// - `DATABASE_URL` (required)
    /// - `DATABASE_MAX_CONNECTIONS` (optional, defaults to 5)
    pub fn from_env() -> Result<Self, AppError> {
        let url = std::env::var("DATABASE_URL").map_err(|_| {
            AppError::ConfigError("DATABASE_URL not set. Required to persist crawl results.".into())
        })?;

        let config = Self::new(url);
        match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => Ok(config.with_max_connections(parse_max_connections(&raw)?)),
            Err(_) => Ok(config),
        }
    }
}

fn parse_max_connections(raw: &str) -> Result<u32, AppError> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(AppError::ConfigError(
            "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
        )),
        Ok(n) => Ok(n),
        Err(_) => Err(AppError::ConfigError(format!(
            "Invalid DATABASE_MAX_CONNECTIONS '{raw}': must be a positive integer"
        ))),
    }
}
