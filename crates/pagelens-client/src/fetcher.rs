use std::net::IpAddr;
use std::time::Duration;

use pagelens_core::error::AppError;
use pagelens_core::traits::{Fetcher, LinkChecker};
use reqwest::Client;
use url::Url;

const USER_AGENT: &str = "PageLens/0.1 (+link checker)";

/// HTTP client for page downloads and link health checks.
///
/// `fetch` issues a GET and returns the body whatever the status code;
/// `check` issues a HEAD and returns only the status code. Redirects are
/// followed in both cases.
///
/// Requests to private/reserved IP ranges are refused by default. Use
/// [`allow_private_urls`](Self::allow_private_urls) to lift that, e.g. for
/// the CLI, where the user controls the machine.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    ssrf_protection: bool,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            ssrf_protection: true,
        })
    }

    /// Allow requests to loopback, private and link-local addresses.
    pub fn allow_private_urls(mut self) -> Self {
        self.ssrf_protection = false;
        self
    }

    async fn guard(&self, url: &str) -> Result<(), AppError> {
        let parsed = parse_http_url(url)?;
        if self.ssrf_protection {
            reject_private_host(&parsed).await?;
        }
        Ok(())
    }

    fn map_send_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.guard(url).await?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "Non-success page, analyzing anyway");
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}

impl LinkChecker for ReqwestFetcher {
    async fn check(&self, url: &str) -> Result<u16, AppError> {
        self.guard(url).await?;

        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        Ok(response.status().as_u16())
    }
}

fn parse_http_url(url: &str) -> Result<Url, AppError> {
    let parsed = Url::parse(url).map_err(|e| AppError::HttpError(format!("Invalid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(AppError::HttpError(format!(
            "URL scheme '{scheme}' is not allowed (only http/https)"
        ))),
    }
}

/// Refuse hosts that are, or resolve to, a private/reserved address.
async fn reject_private_host(url: &Url) -> Result<(), AppError> {
    let host = url
        .host_str()
        .ok_or_else(|| AppError::HttpError("URL has no host".to_string()))?;
    let bare = host.trim_start_matches('[').trim_end_matches(']');

    let addrs: Vec<IpAddr> = match bare.parse::<IpAddr>() {
        Ok(ip) => vec![ip],
        Err(_) => {
            let port = url.port_or_known_default().unwrap_or(80);
            tokio::net::lookup_host((bare, port))
                .await
                .map_err(|e| AppError::NetworkError(format!("DNS resolution failed for {host}: {e}")))?
                .map(|addr| addr.ip())
                .collect()
        }
    };

    if addrs.is_empty() {
        return Err(AppError::NetworkError(format!(
            "DNS resolution returned no addresses for {host}"
        )));
    }
    if let Some(ip) = addrs.into_iter().find(|ip| is_private_ip(*ip)) {
        return Err(AppError::HttpError(format!(
            "Refusing to contact {host}: {ip} is a private or reserved address"
        )));
    }
    Ok(())
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                // 100.64.0.0/10, carrier-grade NAT
                || (a == 100 && (b & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xFFC0) == 0xFE80
                || (first & 0xFE00) == 0xFC00
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(IpAddr::V4(v4)))
        }
    }
}
