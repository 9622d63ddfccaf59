use crate::types::{Post, Result};
use async_trait::async_trait;

/// Trait for pulling posts from a social wall (VK API, scraped page, RSS proxy, ...)
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short identifier used in logs
    fn source_name(&self) -> String;

    /// Fetch up to `limit` posts, newest first.
    /// Any network, status or parse failure is a `RelayError::Fetch`.
    async fn fetch(&self, limit: usize) -> Result<Vec<Post>>;
}

/// Trait for delivering a formatted message to a destination endpoint
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `text` (and an optional image) to `destination`.
    /// Failures surface as `RelayError::Delivery`.
    async fn deliver(&self, destination: &str, text: &str, image_url: Option<&str>) -> Result<()>;
}

/// Trait for the external machine translation call
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    fn backend_name(&self) -> String;

    /// Translate `text`. `Ok(None)` means the service answered without any text.
    async fn translate(&self, text: &str) -> Result<Option<String>>;
}
