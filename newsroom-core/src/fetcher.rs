use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::{redirect, Client, Response};
use tracing::{debug, warn};

use crate::error::FetchError;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
    /// Bodies longer than this are truncated.
    pub max_bytes: usize,
    /// Extra attempts after a transport error or a 5xx response.
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Newsroom/1.0".to_owned(),
            timeout: Duration::from_secs(30),
            max_bytes: 10 * 1024 * 1024,
            max_retries: 1,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Retrieves raw feed documents over HTTP.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .redirect(redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches `url`, failing on any non-2xx status.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) if attempt < self.config.max_retries && is_retryable(&err) => {
                    attempt += 1;
                    let delay = self.config.retry_backoff * attempt;
                    warn!(url, attempt, error = %err, "fetch failed, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        read_limited(response, self.config.max_bytes).await
    }
}

async fn read_limited(response: Response, max_bytes: usize) -> Result<Bytes, FetchError> {
    let mut body = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let remaining = max_bytes - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            debug!(max_bytes, "response truncated at size limit");
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

fn is_retryable(err: &FetchError) -> bool {
    match err {
        FetchError::Network(_) => true,
        FetchError::Status(status) => status.is_server_error(),
    }
}
