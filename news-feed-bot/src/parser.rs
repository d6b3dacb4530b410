use crate::types::{BotError, Item, Result};
use chrono::{DateTime, FixedOffset, Utc};
use feed_rs::parser;
use std::collections::HashSet;
use tracing::debug;

/// Stateless converter from feed documents to [`Item`]s.
///
/// Handles whatever `feed-rs` understands: RSS 0.9x/2.0, Atom and JSON Feed.
pub struct FeedParser;

impl FeedParser {
    pub fn parse_items(content: &[u8], source_name: &str) -> Result<Vec<Item>> {
        Self::parse_items_at(content, source_name, Utc::now())
    }

    /// Like [`parse_items`](Self::parse_items) with an explicit fetch time,
    /// used as the date of entries that carry neither a published nor an
    /// updated timestamp.
    pub fn parse_items_at(
        content: &[u8],
        source_name: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content)
            .map_err(|e| BotError::Parse(format!("Failed to parse feed: {}", e)))?;

        let mut seen_links = HashSet::new();
        let mut items = Vec::with_capacity(feed.entries.len());

        for entry in feed.entries {
            let Some(item) = Self::parse_entry(entry, source_name, fetched_at) else {
                continue;
            };
            if !seen_links.insert(item.link.clone()) {
                debug!("Skipping duplicate entry with link: {}", item.link);
                continue;
            }
            items.push(item);
        }

        debug!("Parsed feed {} with {} entries", source_name, items.len());
        Ok(items)
    }

    fn parse_entry(
        entry: feed_rs::model::Entry,
        source_name: &str,
        fetched_at: DateTime<Utc>,
    ) -> Option<Item> {
        let link = entry.links.first()?.href.trim().to_string();
        if link.is_empty() {
            return None;
        }

        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        let categories = entry
            .categories
            .into_iter()
            .filter_map(|c| {
                if c.term.is_empty() {
                    c.label
                } else {
                    Some(c.term)
                }
            })
            .collect();

        let date = entry.published.or(entry.updated).unwrap_or(fetched_at);

        Some(Item {
            title,
            categories,
            link,
            date: DateTime::<FixedOffset>::from(date),
            summary,
            source_name: source_name.to_string(),
        })
    }
}
