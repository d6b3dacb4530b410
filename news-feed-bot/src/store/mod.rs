pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::types::{BotError, Result};
use url::Url;

/// Accept only absolute http(s) URLs with a host.
pub fn validate_feed_url(feed_url: &str) -> Result<Url> {
    let parsed_url = Url::parse(feed_url.trim())?;

    if !matches!(parsed_url.scheme(), "http" | "https") {
        return Err(BotError::General(format!(
            "Unsupported feed URL scheme: {}",
            parsed_url.scheme()
        )));
    }

    if parsed_url.host().is_none() {
        return Err(BotError::General(format!("Feed URL has no host: {}", feed_url)));
    }

    Ok(parsed_url)
}
