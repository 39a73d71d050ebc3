use std::time::Duration;

use pagelens_core::AppError;

/// Server settings read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub api_key: String,
    pub port: u16,
    /// Let crawls reach loopback and private-network hosts.
    pub allow_private_urls: bool,
    /// Timeout for each page fetch and link check.
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `PAGELENS_API_KEY` (required)
    /// - `PAGELENS_PORT` (optional, defaults to 8080)
    /// - `PAGELENS_ALLOW_PRIVATE_URLS` (optional, defaults to false)
    /// - `PAGELENS_REQUEST_TIMEOUT_SECS` (optional, defaults to 30)
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = std::env::var("PAGELENS_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::ConfigError("PAGELENS_API_KEY must be set".into()))?;

        let port = match std::env::var("PAGELENS_PORT") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!("Invalid PAGELENS_PORT '{raw}'"))
            })?,
            Err(_) => 8080,
        };

        let allow_private_urls = match std::env::var("PAGELENS_ALLOW_PRIVATE_URLS") {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                AppError::ConfigError(format!(
                    "Invalid PAGELENS_ALLOW_PRIVATE_URLS '{raw}': expected true or false"
                ))
            })?,
            Err(_) => false,
        };

        let timeout_secs = match std::env::var("PAGELENS_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(AppError::ConfigError(format!(
                        "Invalid PAGELENS_REQUEST_TIMEOUT_SECS '{raw}': must be a positive integer"
                    )));
                }
            },
            Err(_) => 30,
        };

        Ok(Self {
            api_key,
            port,
            allow_private_urls,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
