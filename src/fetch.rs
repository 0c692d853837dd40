use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info};

use crate::error::FetchError;

const USER_AGENT: &str = concat!("surf_headlines/", env!("CARGO_PKG_VERSION"));

/// Single-attempt HTTP fetcher bounded by a request timeout.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Fetch `url` and return the response body as text.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        info!("Fetching {}", url);
        let start = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(|e| classify(url, e))?;
        debug!(
            "Fetched {} bytes from {} in {}ms",
            body.len(),
            url,
            start.elapsed().as_millis()
        );
        Ok(body)
    }
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source: err,
        }
    }
}

// ── Tests ──
