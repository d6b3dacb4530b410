use crate::traits::FeedSource;
use crate::types::{BotError, Item, Result, Source};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// RSS/Atom adapter backed by the shared HTTP [`Fetcher`].
#[derive(Clone)]
pub struct RssFeedSource {
    fetcher: Fetcher,
}

impl RssFeedSource {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    async fn load_feed(&self, source: &Source) -> Result<Vec<Item>> {
        let content = self.fetcher.fetch_feed(&source.feed_url).await?;
        FeedParser::parse_items(&content, &source.name)
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch(&self, source: &Source, cancel: &CancellationToken) -> Result<Vec<Item>> {
        info!("Pulling RSS feed: {}", source.feed_url);

        // Losing the race drops the request future, which closes the connection.
        let items = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Fetch of {} cancelled", source.feed_url);
                return Err(BotError::Cancelled);
            }
            result = self.load_feed(source) => result?,
        };

        info!(
            "Successfully pulled {} items from RSS feed {}",
            items.len(),
            source.feed_url
        );
        Ok(items)
    }
}
