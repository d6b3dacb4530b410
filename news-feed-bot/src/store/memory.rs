use crate::store::validate_feed_url;
use crate::traits::{ArticleStore, SourceProvider};
use crate::types::{Article, BotError, NewArticle, Result, Source};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    sources: Vec<Source>,
    articles: Vec<Article>,
    next_source_id: i64,
    next_article_id: i64,
}

/// In-process store with the same contract as [`PgStore`](super::PgStore).
/// Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_source(&self, name: &str, feed_url: &str) -> Result<i64> {
        let feed_url = validate_feed_url(feed_url)?;
        let mut state = self.state.write().await;

        if state.sources.iter().any(|s| s.feed_url == feed_url.as_str()) {
            return Err(BotError::General(format!("Source already exists: {}", feed_url)));
        }

        state.next_source_id += 1;
        let id = state.next_source_id;
        state.sources.push(Source {
            id,
            name: name.to_string(),
            feed_url: feed_url.to_string(),
            created: Utc::now(),
        });
        Ok(id)
    }

    pub async fn source_by_id(&self, id: i64) -> Result<Source> {
        let state = self.state.read().await;
        state
            .sources
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(BotError::SourceNotFound { id })
    }

    /// Removes the source together with its articles.
    pub async fn delete_source(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.sources.len();
        state.sources.retain(|s| s.id != id);
        if state.sources.len() == before {
            return Err(BotError::SourceNotFound { id });
        }
        state.articles.retain(|a| a.source_id != id);
        Ok(())
    }

    /// Snapshot of every stored article in insertion order.
    pub async fn articles(&self) -> Vec<Article> {
        self.state.read().await.articles.clone()
    }
}

#[async_trait]
impl SourceProvider for MemoryStore {
    async fn sources(&self) -> Result<Vec<Source>> {
        Ok(self.state.read().await.sources.clone())
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn store(&self, article: NewArticle) -> Result<()> {
        let mut state = self.state.write().await;

        let exists = state
            .articles
            .iter()
            .any(|a| a.source_id == article.source_id && a.link == article.link);
        if exists {
            debug!(source_id = article.source_id, link = %article.link, "Article already stored");
            return Ok(());
        }

        state.next_article_id += 1;
        let id = state.next_article_id;
        state.articles.push(Article {
            id,
            source_id: article.source_id,
            title: article.title,
            link: article.link,
            summary: article.summary,
            published: article.published,
            posted: None,
            created: Utc::now(),
        });
        Ok(())
    }

    async fn all_not_posted(&self, since: DateTime<Utc>, limit: u64) -> Result<Vec<Article>> {
        let state = self.state.read().await;

        let mut candidates: Vec<Article> = state
            .articles
            .iter()
            .filter(|a| a.posted.is_none() && a.published >= since)
            .cloned()
            .collect();

        candidates.sort_by(|a, b| b.published.cmp(&a.published).then(b.id.cmp(&a.id)));
        candidates.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(candidates)
    }

    async fn mark_posted(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(article) = state.articles.iter_mut().find(|a| a.id == id) {
            article.posted.get_or_insert_with(Utc::now);
        }
        Ok(())
    }
}
