use crate::types::{Article, Item, NewArticle, Result, Source};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// Retrieves and parses one feed into items.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch every entry currently published by `source`.
    ///
    /// Returns [`BotError::Cancelled`](crate::BotError::Cancelled) as soon as
    /// `cancel` fires, dropping the in-flight request. Network and parse
    /// failures are returned as-is; there is no retry here.
    async fn fetch(&self, source: &Source, cancel: &CancellationToken) -> Result<Vec<Item>>;
}

/// Lists the feeds the fetch cycle should poll.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn sources(&self) -> Result<Vec<Source>>;
}

/// Durable article storage shared by both cycles.
///
/// Implementations must tolerate concurrent callers.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert an article, silently ignoring a conflict on `(source_id, link)`.
    async fn store(&self, article: NewArticle) -> Result<()>;

    /// Unposted articles published at or after `since`, newest first.
    async fn all_not_posted(&self, since: DateTime<Utc>, limit: u64) -> Result<Vec<Article>>;

    /// Stamp the article as delivered. A stamp is never cleared.
    async fn mark_posted(&self, id: i64) -> Result<()>;
}

/// Turns article text into a short summary.
///
/// A disabled summarizer returns an empty string and no error.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Delivers a pre-formatted message to the configured destination.
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    async fn publish(&self, message: &str) -> Result<()>;
}
