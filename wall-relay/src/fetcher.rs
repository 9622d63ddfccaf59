use crate::types::{FetchConfig, RelayError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Body of a successful GET.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    pub http_status: u16,
    pub response_time_ms: u64,
    pub content: String,
}

/// Shared HTTP GET client for the source adapters.
///
/// Transient failures (transport errors, 5xx, 429) are retried with
/// exponential backoff; anything else fails immediately.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| RelayError::Fetch(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<FetchResult> {
        let start_time = Instant::now();
        debug!("Fetching {}", url);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            let retryable = match self.send(url, query).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let content = response
                            .text()
                            .await
                            .map_err(|e| {
                                RelayError::Fetch(format!("reading body of {}: {}", url, e))
                            })?;
                        info!("Fetched {} ({} bytes)", url, content.len());
                        return Ok(FetchResult {
                            url: url.to_string(),
                            http_status: status.as_u16(),
                            response_time_ms: start_time.elapsed().as_millis() as u64,
                            content,
                        });
                    }

                    last_error = Some(format!(
                        "HTTP {}: {}",
                        status,
                        status.canonical_reason().unwrap_or("Unknown")
                    ));
                    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
                }
                Err(e) => {
                    last_error = Some(e.to_string());
                    true
                }
            };

            if !retryable || attempt == self.config.max_retries {
                break;
            }
            match backoff.next_backoff() {
                Some(delay) => {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                    tokio::time::sleep(delay).await;
                }
                None => break,
            }
        }

        let error_msg = last_error.unwrap_or_else(|| "Unknown error".to_string());
        error!("Failed to fetch {}: {}", url, error_msg);
        Err(RelayError::Fetch(format!("{}: {}", url, error_msg)))
    }

    async fn send(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;
        Ok(response)
    }
}
