//! HTTP implementation of [`Fetch`].

use std::time::Duration;

use super::{Fetch, SourceError};

/// Largest feed body accepted, in bytes.
pub const MAX_FEED_SIZE: usize = 10 * 1024 * 1024;

/// Fetches feeds over HTTP with a fixed per-request timeout.
///
/// Cloning is cheap: the underlying [`reqwest::Client`] is reference-counted
/// and shares its connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body: usize,
}

impl HttpFetcher {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(SourceError::Network)?;
        Ok(Self {
            client,
            max_body: MAX_FEED_SIZE,
        })
    }

    /// Replace the body size limit.
    pub fn with_max_body(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        read_limited(response, self.max_body).await
    }
}

async fn read_limited(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>, SourceError> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(SourceError::TooLarge(limit));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(SourceError::TooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
