use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// A syndication feed the bot polls. Rows are owned by the source table;
/// the fetch cycle only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub feed_url: String,
    pub created: DateTime<Utc>,
}

/// One entry parsed out of a feed during a single fetch.
///
/// Items are never stored as-is. The fetch cycle normalizes `date` to UTC,
/// runs the keyword filter and turns survivors into a [`NewArticle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub categories: Vec<String>,
    pub link: String,
    pub date: DateTime<FixedOffset>,
    pub summary: String,
    pub source_name: String,
}

/// Insert payload for the article table. `id`, `posted` and `created` are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArticle {
    pub source_id: i64,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: DateTime<Utc>,
}

/// A stored article. `(source_id, link)` is unique; `posted` stays `None`
/// until the article has been delivered to the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: DateTime<Utc>,
    pub posted: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
}

impl Article {
    pub fn is_posted(&self) -> bool {
        self.posted.is_some()
    }
}
