use anyhow::Context;
use clap::Parser;
use news_feed_bot::{
    ArticleStore, BotError, ChannelPublisher, Config, Fetcher, LogPublisher, MemoryStore, Notifier,
    OpenAiSummarizer, PgStore, RssAggregator, RssFeedSource, SourceProvider, TelegramPublisher,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DB_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    config.validate().context("invalid configuration")?;

    info!("Starting news feed bot{}", if config.dry_run { " (dry run)" } else { "" });

    let (sources, articles): (Arc<dyn SourceProvider>, Arc<dyn ArticleStore>) = if config.dry_run {
        let store = Arc::new(MemoryStore::new());
        for feed_url in &config.sources {
            match store.add_source(feed_url, feed_url).await {
                Ok(id) => info!(source_id = id, "Registered source {}", feed_url),
                Err(e) => warn!("Skipping source {}: {}", feed_url, e),
            }
        }
        let sources: Arc<dyn SourceProvider> = store.clone();
        let articles: Arc<dyn ArticleStore> = store;
        (sources, articles)
    } else {
        let store = PgStore::connect_with_backoff(&config.database_url, DB_CONNECT_TIMEOUT)
            .await
            .context("failed to connect to the database")?;
        store.setup_schema().await.context("failed to prepare the schema")?;
        info!("Connected to PostgreSQL");
        let store = Arc::new(store);
        let sources: Arc<dyn SourceProvider> = store.clone();
        let articles: Arc<dyn ArticleStore> = store;
        (sources, articles)
    };

    let fetcher = Fetcher::new(config.fetch_config()).context("failed to build HTTP client")?;

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("failed to build API client")?;

    let summarizer = Arc::new(
        OpenAiSummarizer::new(http.clone(), config.openai_key.clone(), config.openai_prompt.clone())
            .with_model(config.openai_model.clone()),
    );

    let publisher: Arc<dyn ChannelPublisher> = match (
        config.dry_run,
        config.telegram_bot_token.clone(),
        config.telegram_channel_id,
    ) {
        (false, Some(token), Some(chat_id)) => Arc::new(TelegramPublisher::new(http, token, chat_id)),
        _ => Arc::new(LogPublisher::default()),
    };

    let aggregator = RssAggregator::new(
        sources,
        articles.clone(),
        Arc::new(RssFeedSource::new(fetcher.clone())),
        config.fetch_settings(),
    );
    let notifier = Notifier::new(articles, summarizer, publisher, fetcher, config.notify_settings());

    let cancel = CancellationToken::new();

    let fetch_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { aggregator.start(&cancel).await })
    };
    let notify_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { notifier.start(&cancel).await })
    };

    shutdown_signal().await;
    info!("Shutdown requested, waiting for running ticks to finish");
    cancel.cancel();

    for (name, task) in [("fetcher", fetch_task), ("notifier", notify_task)] {
        match task.await {
            Ok(Ok(())) | Ok(Err(BotError::Cancelled)) => info!("{} stopped", name),
            Ok(Err(e)) => error!("{} failed: {}", name, e),
            Err(e) => error!("{} task failed: {}", name, e),
        }
    }

    info!("News feed bot stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
