mod common;

use chrono::{FixedOffset, TimeZone, Utc};
use common::{init_tracing, item, FlakySourceProvider, StaticFeedSource};
use news_feed_bot::types::*;
use news_feed_bot::{MemoryStore, RssAggregator};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

fn settings(keywords: &[&str]) -> FetchSettings {
    FetchSettings {
        fetch_interval: Duration::from_secs(600),
        source_timeout: Duration::from_secs(5),
        filter_keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

async fn store_with_sources(count: usize) -> Result<(Arc<MemoryStore>, Vec<i64>)> {
    let store = Arc::new(MemoryStore::new());
    let mut ids = Vec::new();
    for n in 1..=count {
        let url = format!("https://feed{}.example/rss", n);
        ids.push(store.add_source(&format!("Feed {}", n), &url).await?);
    }
    Ok((store, ids))
}

fn aggregator(store: &Arc<MemoryStore>, feed: StaticFeedSource, keywords: &[&str]) -> RssAggregator {
    RssAggregator::new(store.clone(), store.clone(), Arc::new(feed), settings(keywords))
}

#[tokio::test]
async fn test_failing_source_does_not_block_others() -> Result<()> {
    init_tracing();
    info!("Testing partial source failure");

    let (store, ids) = store_with_sources(3).await?;
    let now = Utc::now().fixed_offset();
    let feed = StaticFeedSource::new()
        .with_items(ids[0], vec![item("A", "https://a/1", now), item("B", "https://a/2", now)])
        .failing(ids[1])
        .with_items(ids[2], vec![item("C", "https://c/1", now)]);

    let report = aggregator(&store, feed, &[]).run_once(&CancellationToken::new()).await?;

    assert_eq!(report.sources_total, 3);
    assert_eq!(report.sources_failed, 1);
    assert_eq!(report.items_stored, 3);
    assert_eq!(store.articles().await.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_rerun_stores_nothing_new() -> Result<()> {
    init_tracing();

    let (store, ids) = store_with_sources(1).await?;
    let now = Utc::now().fixed_offset();
    let feed = StaticFeedSource::new().with_items(ids[0], vec![item("A", "https://a/1", now)]);
    let aggregator = aggregator(&store, feed, &[]);
    let cancel = CancellationToken::new();

    aggregator.run_once(&cancel).await?;
    aggregator.run_once(&cancel).await?;

    assert_eq!(store.articles().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_filtered_items_are_not_stored() -> Result<()> {
    init_tracing();

    let (store, ids) = store_with_sources(1).await?;
    let now = Utc::now().fixed_offset();

    let mut tagged = item("Quarterly results", "https://a/2", now);
    tagged.categories = vec!["Sports".to_string()];

    let feed = StaticFeedSource::new().with_items(
        ids[0],
        vec![
            item("Live SPORTS coverage", "https://a/1", now),
            tagged,
            item("Local elections", "https://a/3", now),
        ],
    );

    let report = aggregator(&store, feed, &["sports", "Sports"])
        .run_once(&CancellationToken::new())
        .await?;

    assert_eq!(report.items_fetched, 3);
    assert_eq!(report.items_skipped, 2);

    let articles = store.articles().await;
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].link, "https://a/3");

    Ok(())
}

#[tokio::test]
async fn test_published_time_is_normalized_to_utc() -> Result<()> {
    init_tracing();

    let (store, ids) = store_with_sources(1).await?;
    let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
    let local = plus_three.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap();
    let feed = StaticFeedSource::new().with_items(ids[0], vec![item("A", "https://a/1", local)]);

    aggregator(&store, feed, &[]).run_once(&CancellationToken::new()).await?;

    let articles = store.articles().await;
    assert_eq!(
        articles[0].published,
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    );

    Ok(())
}

#[tokio::test]
async fn test_cancelled_token_returns_cancelled_without_writes() -> Result<()> {
    init_tracing();

    let (store, ids) = store_with_sources(2).await?;
    let now = Utc::now().fixed_offset();
    let feed = StaticFeedSource::new()
        .with_items(ids[0], vec![item("A", "https://a/1", now)])
        .with_items(ids[1], vec![item("B", "https://b/1", now)]);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = aggregator(&store, feed, &[]).run_once(&cancel).await;

    assert!(matches!(result, Err(BotError::Cancelled)));
    assert!(store.articles().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_cancel_during_fetch_joins_all_sources() -> Result<()> {
    init_tracing();

    let (store, ids) = store_with_sources(3).await?;
    let now = Utc::now().fixed_offset();
    let feed = StaticFeedSource::new()
        .with_items(ids[0], vec![item("A", "https://a/1", now)])
        .with_delay(Duration::from_secs(30));

    let aggregator = aggregator(&store, feed, &[]);
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let result = tokio::time::timeout(Duration::from_secs(5), aggregator.run_once(&cancel))
        .await
        .expect("run_once should return promptly after cancellation");
    canceller.await.unwrap();

    assert!(matches!(result, Err(BotError::Cancelled)));
    assert!(store.articles().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_slow_source_hits_deadline() -> Result<()> {
    init_tracing();

    let (store, ids) = store_with_sources(1).await?;
    let now = Utc::now().fixed_offset();
    let feed = StaticFeedSource::new()
        .with_items(ids[0], vec![item("A", "https://a/1", now)])
        .with_delay(Duration::from_secs(30));

    let mut settings = settings(&[]);
    settings.source_timeout = Duration::from_millis(50);
    let aggregator = RssAggregator::new(store.clone(), store.clone(), Arc::new(feed), settings);

    let report = aggregator.run_once(&CancellationToken::new()).await?;

    assert_eq!(report.sources_failed, 1);
    assert!(store.articles().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_start_runs_first_tick_and_stops_on_cancel() -> Result<()> {
    init_tracing();

    let (store, ids) = store_with_sources(1).await?;
    let now = Utc::now().fixed_offset();
    let feed = Arc::new(
        StaticFeedSource::new().with_items(ids[0], vec![item("A", "https://a/1", now)]),
    );
    let aggregator = Arc::new(RssAggregator::new(
        store.clone(),
        store.clone(),
        feed.clone(),
        settings(&[]),
    ));

    let cancel = CancellationToken::new();
    let handle = {
        let aggregator = aggregator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { aggregator.start(&cancel).await })
    };

    for _ in 0..100 {
        if !store.articles().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler should stop after cancellation")
        .unwrap();

    assert!(matches!(result, Err(BotError::Cancelled)));
    assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.articles().await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_source_listing_failure_aborts_tick_only() -> Result<()> {
    init_tracing();
    info!("Testing recovery after a failed source listing");

    let (store, ids) = store_with_sources(1).await?;
    let now = Utc::now().fixed_offset();
    let feed = Arc::new(
        StaticFeedSource::new().with_items(ids[0], vec![item("A", "https://a/1", now)]),
    );
    let provider = Arc::new(FlakySourceProvider::new(store.clone(), 1));

    let aggregator = RssAggregator::new(provider, store.clone(), feed.clone(), settings(&[]));

    // A direct call reports the failure and touches nothing.
    let result = aggregator.run_once(&CancellationToken::new()).await;
    assert!(matches!(result, Err(BotError::General(_))));
    assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    assert!(store.articles().await.is_empty());

    // Under the scheduler, a failing listing does not end the loop.
    let provider = Arc::new(FlakySourceProvider::new(store.clone(), 2));
    let mut fast = settings(&[]);
    fast.fetch_interval = Duration::from_millis(20);
    let scheduled = Arc::new(RssAggregator::new(
        provider.clone(),
        store.clone(),
        feed.clone(),
        fast,
    ));

    let cancel = CancellationToken::new();
    let handle = {
        let scheduled = scheduled.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduled.start(&cancel).await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while store.articles().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("scheduler should recover after failed listings");

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler should stop after cancellation")
        .unwrap();

    assert!(matches!(result, Err(BotError::Cancelled)));
    assert!(provider.calls.load(Ordering::SeqCst) >= 3);
    assert_eq!(store.articles().await.len(), 1);

    Ok(())
}
