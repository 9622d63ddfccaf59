use serde::{Deserialize, Serialize};

pub use interfaces::defs::{Notification, Post};

/// Ordered, normalized hashtags pulled from a post body.
pub type HashtagSet = Vec<String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "RF4FR-DiscordRelay/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_seconds: 2,
            max_redirects: 5,
        }
    }
}

/// What happened to one post during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    AlreadySeen,
    Delivered { destination: String, label: String },
    DeliveryFailed { destination: String, error: String },
}

/// Summary of a single relay run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub fetched: usize,
    pub skipped_seen: usize,
    pub sent: usize,
    pub failed: usize,
    pub translation_fallbacks: usize,
    pub outcomes: Vec<(String, PostOutcome)>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Delivery to {destination} failed: {reason}")]
    Delivery { destination: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    /// Errors that end the run rather than a single post.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RelayError::Translation(_) | RelayError::Delivery { .. })
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
