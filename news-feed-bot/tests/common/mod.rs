#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use news_feed_bot::types::*;
use news_feed_bot::{
    ArticleStore, ChannelPublisher, FeedSource, MemoryStore, SourceProvider, Summarizer,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

pub fn item(title: &str, link: &str, date: DateTime<FixedOffset>) -> Item {
    Item {
        title: title.to_string(),
        categories: Vec::new(),
        link: link.to_string(),
        date,
        summary: String::new(),
        source_name: "test".to_string(),
    }
}

pub fn new_article(source_id: i64, link: &str, published: DateTime<Utc>) -> NewArticle {
    NewArticle {
        source_id,
        title: format!("Article {}", link),
        link: link.to_string(),
        summary: String::new(),
        published,
    }
}

/// Serves canned items per source id and fails the sources listed in `failing`.
#[derive(Default)]
pub struct StaticFeedSource {
    items: HashMap<i64, Vec<Item>>,
    failing: Vec<i64>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StaticFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, source_id: i64, items: Vec<Item>) -> Self {
        self.items.insert(source_id, items);
        self
    }

    pub fn failing(mut self, source_id: i64) -> Self {
        self.failing.push(source_id);
        self
    }

    /// Hold every fetch for `delay` (observing cancellation).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    async fn fetch(&self, source: &Source, cancel: &CancellationToken) -> Result<Vec<Item>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(BotError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if self.failing.contains(&source.id) {
            return Err(BotError::General(format!("feed {} is down", source.id)));
        }

        Ok(self.items.get(&source.id).cloned().unwrap_or_default())
    }
}

/// Returns a fixed summary and records every input text.
pub struct StubSummarizer {
    summary: String,
    enabled: bool,
    pub inputs: Mutex<Vec<String>>,
}

impl StubSummarizer {
    pub fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            enabled: true,
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            summary: String::new(),
            enabled: false,
            inputs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        self.inputs.lock().unwrap().push(text.to_string());
        Ok(self.summary.clone())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Keeps every published message.
#[derive(Default)]
pub struct RecordingPublisher {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingPublisher {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelPublisher for RecordingPublisher {
    async fn publish(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Rejects every message.
#[derive(Default)]
pub struct FailingPublisher {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl ChannelPublisher for FailingPublisher {
    async fn publish(&self, _message: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(BotError::Telegram("Bad Request: chat not found".to_string()))
    }
}

/// Summarizer whose backend always rejects the request.
#[derive(Default)]
pub struct FailingSummarizer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BotError::Summarizer("OpenAI API error (429): rate limited".to_string()))
    }
}

/// Delegates to a [`MemoryStore`] but refuses to mark anything posted.
pub struct UnmarkableStore {
    pub inner: Arc<MemoryStore>,
}

#[async_trait]
impl ArticleStore for UnmarkableStore {
    async fn store(&self, article: NewArticle) -> Result<()> {
        self.inner.store(article).await
    }

    async fn all_not_posted(&self, since: DateTime<Utc>, limit: u64) -> Result<Vec<Article>> {
        self.inner.all_not_posted(since, limit).await
    }

    async fn mark_posted(&self, _id: i64) -> Result<()> {
        Err(BotError::General("connection reset while marking article".to_string()))
    }
}

/// Fails the first `failures` listings, then delegates to a [`MemoryStore`].
pub struct FlakySourceProvider {
    pub inner: Arc<MemoryStore>,
    failures: usize,
    pub calls: AtomicUsize,
}

impl FlakySourceProvider {
    pub fn new(inner: Arc<MemoryStore>, failures: usize) -> Self {
        Self {
            inner,
            failures,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SourceProvider for FlakySourceProvider {
    async fn sources(&self) -> Result<Vec<Source>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(BotError::General("source table unavailable".to_string()));
        }
        self.inner.sources().await
    }
}
