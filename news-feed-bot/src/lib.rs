pub mod types;
pub mod traits;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod filter;
pub mod sources;
pub mod schedule;
pub mod aggregator;
pub mod notifier;
pub mod summarizer;
pub mod publishers;
pub mod store;
pub mod utils;

pub use types::*;
pub use traits::{ArticleStore, ChannelPublisher, FeedSource, SourceProvider, Summarizer};
pub use config::Config;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use filter::KeywordFilter;
pub use sources::RssFeedSource;
pub use aggregator::{FetchReport, RssAggregator};
pub use notifier::{format_message, Notifier};
pub use summarizer::OpenAiSummarizer;
pub use publishers::{LogPublisher, TelegramPublisher};
pub use store::{MemoryStore, PgStore};
