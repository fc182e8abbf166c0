use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::{Error, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// HTTP client used for crawling pages and probing site readiness.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a new fetcher with the default request timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Creates a new fetcher with a custom per-request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sitesearch/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    /// Fetches a page and returns its body as text.
    ///
    /// Any non-2xx answer fails with [`Error::HttpStatus`].
    pub async fn fetch_page(&self, url: &Url) -> Result<String> {
        info!("Fetching {url}");
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content = response.text().await?;
        debug!("Fetched {} bytes from {}", content.len(), url);
        Ok(content)
    }

    /// Whether `url` currently answers with a 2xx status.
    ///
    /// Connection failures count as "not ready" rather than errors.
    pub async fn is_ready(&self, url: &Url) -> bool {
        match self.client.get(url.as_str()).send().await {
            Ok(response) => {
                let status = response.status();
                debug!("Readiness probe {url} answered {status}");
                status.is_success()
            },
            Err(err) => {
                debug!("Readiness probe {url} failed: {err}");
                false
            },
        }
    }
}
