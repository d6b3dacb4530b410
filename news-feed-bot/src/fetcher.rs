use crate::types::{BotError, FetchConfig, Result};
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Thin wrapper over one shared `reqwest::Client`.
///
/// Dropping any of the returned futures aborts the underlying request.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect)
            .build()?;

        Ok(Self { client, config })
    }

    /// Download a feed document and return its raw bytes.
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<u8>> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let response = self.get(url).await?;
        let body = response.bytes().await?;
        self.check_size(body.len() as u64)?;

        info!(
            "Fetched feed: {} ({} bytes in {}ms)",
            url,
            body.len(),
            start_time.elapsed().as_millis()
        );
        Ok(body.to_vec())
    }

    /// Download a web page for enrichment.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        debug!("Fetching full content from: {}", url);

        let response = self.get(url).await?;
        let content = response.text().await?;
        self.check_size(content.len() as u64)?;
        Ok(content)
    }

    async fn get(&self, url: &str) -> Result<Response> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        if let Some(content_length) = response.content_length() {
            self.check_size(content_length)?;
        }

        Ok(response)
    }

    fn check_size(&self, len: u64) -> Result<()> {
        let size_mb = len as usize / (1024 * 1024);
        if size_mb > self.config.max_body_size_mb {
            return Err(BotError::BodyTooLarge { size_mb });
        }
        Ok(())
    }
}
