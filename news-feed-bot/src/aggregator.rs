use crate::filter::KeywordFilter;
use crate::schedule::{panic_message, run_on_interval, with_cancel, with_deadline};
use crate::traits::{ArticleStore, FeedSource, SourceProvider};
use crate::types::{BotError, FetchSettings, Item, NewArticle, Result, Source};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of one fetch tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub sources_total: usize,
    pub sources_failed: usize,
    pub items_fetched: usize,
    pub items_skipped: usize,
    pub items_stored: usize,
}

#[derive(Debug, Default)]
struct SourceOutcome {
    fetched: usize,
    skipped: usize,
    stored: usize,
}

/// Ingestion scheduler: polls every configured feed, filters the entries and
/// writes the survivors to the article store.
pub struct RssAggregator {
    sources: Arc<dyn SourceProvider>,
    articles: Arc<dyn ArticleStore>,
    feed_source: Arc<dyn FeedSource>,
    filter: Arc<KeywordFilter>,
    settings: FetchSettings,
}

impl RssAggregator {
    pub fn new(
        sources: Arc<dyn SourceProvider>,
        articles: Arc<dyn ArticleStore>,
        feed_source: Arc<dyn FeedSource>,
        settings: FetchSettings,
    ) -> Self {
        let filter = Arc::new(KeywordFilter::new(settings.filter_keywords.iter().cloned()));

        Self {
            sources,
            articles,
            feed_source,
            filter,
            settings,
        }
    }

    /// Run one tick right away, then one per fetch interval until `cancel` fires.
    pub async fn start(&self, cancel: &CancellationToken) -> Result<()> {
        info!(
            "Starting fetcher (interval {:?}, {} filter keywords)",
            self.settings.fetch_interval,
            self.settings.filter_keywords.len()
        );

        run_on_interval("fetcher", self.settings.fetch_interval, cancel, || async {
            self.run_once(cancel).await.map(|_| ())
        })
        .await
    }

    /// Fetch every source concurrently and wait for all of them.
    ///
    /// A failing source is logged and counted; it never fails the tick. Only
    /// a failure to list the sources, or cancellation, is returned as an error,
    /// and even on cancellation every per-source task is joined first.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<FetchReport> {
        if cancel.is_cancelled() {
            return Err(BotError::Cancelled);
        }

        let sources = with_cancel(cancel, self.sources.sources()).await?;
        let mut report = FetchReport {
            sources_total: sources.len(),
            ..Default::default()
        };

        info!("Fetching {} sources", sources.len());

        let tick = cancel.child_token();
        let mut tasks = JoinSet::new();

        for source in sources {
            let articles = self.articles.clone();
            let feed_source = self.feed_source.clone();
            let filter = self.filter.clone();
            let token = tick.clone();
            let limit = self.settings.source_timeout;

            tasks.spawn(async move {
                let what = format!("source {:?}", source.name);
                let outcome = with_deadline(
                    &what,
                    limit,
                    fetch_source(&source, feed_source.as_ref(), articles.as_ref(), &filter, &token),
                )
                .await;
                (source, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((source, Ok(outcome))) => {
                    debug!(
                        source_id = source.id,
                        "Source {:?}: fetched {}, skipped {}, stored {}",
                        source.name,
                        outcome.fetched,
                        outcome.skipped,
                        outcome.stored
                    );
                    report.items_fetched += outcome.fetched;
                    report.items_skipped += outcome.skipped;
                    report.items_stored += outcome.stored;
                }
                Ok((source, Err(e))) => {
                    report.sources_failed += 1;
                    if e.is_cancelled() {
                        debug!(source_id = source.id, "Source {:?} cancelled", source.name);
                    } else {
                        error!(
                            source_id = source.id,
                            "An error occurred while processing source {:?}: {}",
                            source.name,
                            e
                        );
                    }
                }
                Err(e) if e.is_panic() => {
                    report.sources_failed += 1;
                    error!("Source task panicked: {}", panic_message(&e.into_panic()));
                }
                Err(e) => {
                    report.sources_failed += 1;
                    warn!("Source task aborted: {}", e);
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(BotError::Cancelled);
        }

        info!(
            "Fetch finished: {}/{} sources ok, {} items stored, {} skipped",
            report.sources_total - report.sources_failed,
            report.sources_total,
            report.items_stored,
            report.items_skipped
        );
        Ok(report)
    }
}

async fn fetch_source(
    source: &Source,
    feed_source: &dyn FeedSource,
    articles: &dyn ArticleStore,
    filter: &KeywordFilter,
    cancel: &CancellationToken,
) -> Result<SourceOutcome> {
    let items = feed_source.fetch(source, cancel).await?;
    process_items(source, items, articles, filter, cancel).await
}

async fn process_items(
    source: &Source,
    items: Vec<Item>,
    articles: &dyn ArticleStore,
    filter: &KeywordFilter,
    cancel: &CancellationToken,
) -> Result<SourceOutcome> {
    let mut outcome = SourceOutcome {
        fetched: items.len(),
        ..Default::default()
    };

    for item in items {
        let published = item.date.with_timezone(&Utc);

        if filter.should_skip(&item) {
            debug!(source_id = source.id, link = %item.link, "Skipping filtered item");
            outcome.skipped += 1;
            continue;
        }

        let article = NewArticle {
            source_id: source.id,
            title: item.title,
            link: item.link,
            summary: item.summary,
            published,
        };

        with_cancel(cancel, articles.store(article)).await?;
        outcome.stored += 1;
    }

    Ok(outcome)
}
