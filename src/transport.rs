use crate::config::HttpConfig;
use crate::error::{Result, ScraperError};
use crate::metrics::CrawlMetrics;
use crate::page::{ListingSelectors, Page};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Fetches one results page.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page>;
}

/// `reqwest`-backed transport that parses the body with the configured selectors
pub struct HttpTransport {
    client: reqwest::Client,
    selectors: ListingSelectors,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig, selectors: ListingSelectors) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            selectors,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    async fn get_body(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Fetch {
                url: url.to_string(),
                message: format!("status {}", status),
            });
        }
        Ok(response.text().await?)
    }
}

fn is_retryable(error: &ScraperError) -> bool {
    match error {
        ScraperError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        ScraperError::Fetch { message, .. } => message.starts_with("status 5"),
        _ => false,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Page> {
        let mut attempt = 0;
        let body = loop {
            let t0 = std::time::Instant::now();
            match self.get_body(url).await {
                Ok(body) => {
                    CrawlMetrics::record_fetch_success(t0.elapsed().as_secs_f64(), body.len());
                    break body;
                }
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    warn!("Fetch attempt {} failed, retrying: {}", attempt, e);
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => {
                    CrawlMetrics::record_fetch_error();
                    return Err(match e {
                        ScraperError::Fetch { .. } => e,
                        other => ScraperError::Fetch {
                            url: url.to_string(),
                            message: other.to_string(),
                        },
                    });
                }
            }
        };

        debug!("Fetched {} bytes", body.len());
        Page::from_html(url, &body, &self.selectors)
    }
}
