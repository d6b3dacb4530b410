use std::time::Duration;

// Shared model types live in the interfaces crate
pub use interfaces::defs::{Article, Item, NewArticle, Source};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_body_size_mb: usize,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "NewsFeedBot/1.0".to_string(),
            timeout_seconds: 30,
            max_body_size_mb: 10,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

/// Settings for the ingestion scheduler.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub fetch_interval: Duration,
    pub source_timeout: Duration,
    pub filter_keywords: Vec<String>,
}

/// Settings for the selection and publication scheduler.
#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub send_interval: Duration,
    pub lookup_time_window: Duration,
    pub tick_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Source not found: {id}")]
    SourceNotFound { id: i64 },

    #[error("Body size exceeds limit: {size_mb}MB")]
    BodyTooLarge { size_mb: usize },

    #[error("Telegram API error: {0}")]
    Telegram(String),

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Timed out: {what}")]
    Timeout { what: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("General error: {0}")]
    General(String),
}

impl BotError {
    /// Shutdown is reported through the same channel as failures but must
    /// never be logged as one.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BotError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
