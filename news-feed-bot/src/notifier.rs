use crate::schedule::{run_on_interval, with_cancel, with_deadline};
use crate::traits::{ArticleStore, ChannelPublisher, Summarizer};
use crate::types::{Article, BotError, NotifySettings, Result};
use crate::utils::markdown;
use crate::utils::text::{collapse_blank_lines, readable_text};
use crate::Fetcher;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Selection and publication scheduler: every tick picks the newest unposted
/// article inside the lookup window, summarizes it, sends it to the channel
/// and marks it posted.
pub struct Notifier {
    articles: Arc<dyn ArticleStore>,
    summarizer: Arc<dyn Summarizer>,
    publisher: Arc<dyn ChannelPublisher>,
    fetcher: Fetcher,
    settings: NotifySettings,
}

impl Notifier {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        summarizer: Arc<dyn Summarizer>,
        publisher: Arc<dyn ChannelPublisher>,
        fetcher: Fetcher,
        settings: NotifySettings,
    ) -> Self {
        Self {
            articles,
            summarizer,
            publisher,
            fetcher,
            settings,
        }
    }

    pub async fn start(&self, cancel: &CancellationToken) -> Result<()> {
        info!(
            "Starting notifier (interval {:?}, lookup window {:?})",
            self.settings.send_interval, self.settings.lookup_time_window
        );

        run_on_interval("notifier", self.settings.send_interval, cancel, || async {
            self.run_once(cancel).await.map(|_| ())
        })
        .await
    }

    /// Publish at most one article. Returns the article that was posted, or
    /// `None` when everything inside the window has already been sent.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<Option<Article>> {
        if cancel.is_cancelled() {
            return Err(BotError::Cancelled);
        }

        let since = chrono::Duration::from_std(self.settings.lookup_time_window)
            .ok()
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .ok_or_else(|| {
                BotError::Config(format!(
                    "lookup time window out of range: {:?}",
                    self.settings.lookup_time_window
                ))
            })?;

        let candidates = with_cancel(cancel, self.articles.all_not_posted(since, 1)).await?;

        let Some(article) = candidates.into_iter().next() else {
            info!("All articles are posted");
            return Ok(None);
        };

        with_deadline(
            "notification tick",
            self.settings.tick_timeout,
            with_cancel(cancel, self.send_article(&article)),
        )
        .await?;

        info!(article_id = article.id, link = %article.link, "Article posted");
        Ok(Some(article))
    }

    /// Enrich, deliver and mark one article. Any failure leaves the article
    /// unposted so the next tick selects it again.
    async fn send_article(&self, article: &Article) -> Result<()> {
        let summary = self.extract_summary(article).await.map_err(|e| {
            if !e.is_cancelled() {
                warn!(article_id = article.id, "Failed to summarize {}: {}", article.link, e);
            }
            e
        })?;

        let message = format_message(article, &summary);
        self.publisher.publish(&message).await?;

        self.articles.mark_posted(article.id).await
    }

    async fn extract_summary(&self, article: &Article) -> Result<String> {
        if !self.summarizer.is_enabled() {
            return Ok(String::new());
        }

        let source_text = if article.summary.trim().is_empty() {
            debug!(article_id = article.id, "No inline summary, fetching {}", article.link);
            self.fetcher.fetch_page(&article.link).await?
        } else {
            article.summary.clone()
        };

        let text = collapse_blank_lines(&readable_text(&source_text));
        if text.is_empty() {
            return Ok(String::new());
        }

        self.summarizer.summarize(&text).await
    }
}

/// Build the MarkdownV2 message for an article. Title, summary and link are
/// escaped separately; an empty summary is left out.
pub fn format_message(article: &Article, summary: &str) -> String {
    let mut message = format!("*{}*", markdown::escape(&article.title));

    let summary = summary.trim();
    if !summary.is_empty() {
        message.push_str("\n\n");
        message.push_str(&markdown::escape(summary));
    }

    message.push_str("\n\n");
    message.push_str(&markdown::escape(&article.link));
    message
}
