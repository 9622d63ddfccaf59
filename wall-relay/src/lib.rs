pub mod types;
pub mod config;
pub mod hashtags;
pub mod routing;
pub mod seen;
pub mod state;
pub mod translation;
pub mod traits;
pub mod fetcher;
pub mod sources;
pub mod sink;
pub mod notification;
pub mod pipeline;

pub use types::*;
pub use config::RelayConfig;
pub use fetcher::Fetcher;
pub use routing::{Classification, Route, RoutingTable};
pub use seen::SeenSet;
pub use translation::{MyMemoryBackend, Translated, TranslationCache, Translator};
pub use traits::{NotificationSink, SourceAdapter, TranslationBackend};
pub use sources::{build_source, RssProxySource, VkApiSource, VkMobileSource};
pub use sink::DiscordWebhookSink;
pub use pipeline::{run_once, PipelineSettings, RelayPipeline};
