use crate::config::{RelayConfig, RunLimits};
use crate::hashtags;
use crate::notification;
use crate::routing::RoutingTable;
use crate::seen::SeenSet;
use crate::sink::DiscordWebhookSink;
use crate::sources::build_source;
use crate::traits::{NotificationSink, SourceAdapter, TranslationBackend};
use crate::translation::{
    truncate_chars, MyMemoryBackend, Translated, TranslationCache, Translator, DEFAULT_MAX_CHARS,
};
use crate::types::{Post, PostOutcome, Result, RunReport};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Knobs for a single run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub batch_size: usize,
    pub max_per_run: usize,
    pub delay: Duration,
    pub seen_cap: usize,
    pub max_chars: usize,
    pub persist_each_delivery: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config_limits(&RunLimits::default(), DEFAULT_MAX_CHARS, true)
    }
}

impl PipelineSettings {
    fn from_config_limits(
        limits: &RunLimits,
        max_chars: usize,
        persist_each_delivery: bool,
    ) -> Self {
        Self {
            batch_size: limits.batch_size,
            max_per_run: limits.max_per_run,
            delay: Duration::from_millis(limits.delay_ms),
            seen_cap: limits.seen_cap,
            max_chars,
            persist_each_delivery,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::from_config_limits(
            &config.limits,
            config.translation.max_chars,
            config.state.persist_each_delivery,
        )
    }
}

/// Fetch → order → dedup → classify → translate → deliver → record.
///
/// The pipeline owns its routing table, seen ledger and translation cache for
/// the duration of a run. Runs against the same state files must not overlap.
pub struct RelayPipeline {
    source: Box<dyn SourceAdapter>,
    sink: Box<dyn NotificationSink>,
    backend: Box<dyn TranslationBackend>,
    routing: RoutingTable,
    seen: SeenSet,
    cache: TranslationCache,
    settings: PipelineSettings,
}

impl RelayPipeline {
    pub fn new(
        source: Box<dyn SourceAdapter>,
        sink: Box<dyn NotificationSink>,
        backend: Box<dyn TranslationBackend>,
        routing: RoutingTable,
        seen: SeenSet,
        cache: TranslationCache,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            sink,
            backend,
            routing,
            seen,
            cache,
            settings,
        }
    }

    /// Build a pipeline from configuration, loading persisted state.
    ///
    /// A missing default destination fails here, before any file is read.
    pub fn load(
        config: &RelayConfig,
        source: Box<dyn SourceAdapter>,
        sink: Box<dyn NotificationSink>,
        backend: Box<dyn TranslationBackend>,
    ) -> Result<Self> {
        let default_destination = config.default_destination()?;
        let routing =
            RoutingTable::build(&config.routes, default_destination, &config.unclassified_label);
        info!("Routing table has {} routes", routing.len());

        let seen = SeenSet::load(&config.state.seen_path);
        let cache = TranslationCache::load(&config.state.cache_path);

        Ok(Self::new(
            source,
            sink,
            backend,
            routing,
            seen,
            cache,
            PipelineSettings::from_config(config),
        ))
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Execute one run.
    ///
    /// Only a fetch failure (or a failure to write state at the end) is
    /// returned as an error. Per-post failures are recorded in the report.
    pub async fn run(&mut self) -> Result<RunReport> {
        let mut posts = self.source.fetch(self.settings.batch_size).await?;
        info!("{}: fetched {} posts", self.source.source_name(), posts.len());
        if let Some(first) = posts.first() {
            debug!("Sample post text: {}", truncate_chars(&first.text, 200));
        }

        // Adapters return newest first; deliver in chronological order.
        posts.reverse();

        let mut report = RunReport {
            fetched: posts.len(),
            ..RunReport::default()
        };

        for post in &posts {
            if report.sent >= self.settings.max_per_run {
                info!(
                    "Reached {} deliveries for this run, the rest waits",
                    self.settings.max_per_run
                );
                break;
            }

            if self.seen.contains(&post.id) {
                report.skipped_seen += 1;
                report.outcomes.push((post.id.clone(), PostOutcome::AlreadySeen));
                continue;
            }

            let outcome = self.relay_post(post, &mut report).await;
            let delivered = matches!(outcome, PostOutcome::Delivered { .. });
            report.outcomes.push((post.id.clone(), outcome));

            if delivered && self.settings.persist_each_delivery {
                if let Err(e) = self.checkpoint() {
                    warn!("Checkpoint after {} failed: {}", post.id, e);
                }
            }

            if report.sent < self.settings.max_per_run && !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }
        }

        self.checkpoint()?;
        info!(
            "Run finished: fetched={} already_seen={} sent={} failed={}",
            report.fetched, report.skipped_seen, report.sent, report.failed
        );
        Ok(report)
    }

    async fn relay_post(&mut self, post: &Post, report: &mut RunReport) -> PostOutcome {
        let tags = hashtags::extract(&post.text);
        let classification = self.routing.classify(&tags);
        debug!("Post {} tags={:?} -> {}", post.id, tags, classification.label);

        let max_chars = self.settings.max_chars;
        let translated = Translator::new(self.backend.as_ref(), &mut self.cache, max_chars)
            .translate_or_source(&post.text)
            .await;
        if matches!(translated, Translated::Untranslated(_)) {
            report.translation_fallbacks += 1;
        }

        let notification = notification::build(post, &classification, translated.text());
        let text = notification::render(&notification);

        match self
            .sink
            .deliver(&notification.destination, &text, notification.image_url.as_deref())
            .await
        {
            Ok(()) => {
                self.seen.add(post.id.clone());
                report.sent += 1;
                info!("Relayed {} to {} ({})", post.id, classification.label, post.url);
                PostOutcome::Delivered {
                    destination: notification.destination,
                    label: notification.label,
                }
            }
            Err(e) => {
                report.failed += 1;
                error!("Delivery of {} failed, will retry next run: {}", post.id, e);
                PostOutcome::DeliveryFailed {
                    destination: notification.destination,
                    error: e.to_string(),
                }
            }
        }
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.seen.persist(self.settings.seen_cap)?;
        self.cache.persist()?;
        Ok(())
    }
}

/// Wire the configured source, Discord sink and MyMemory backend, then run once.
pub async fn run_once(config: &RelayConfig) -> Result<RunReport> {
    config.validate()?;

    let source = build_source(&config.source, &config.fetch)?;
    let sink = DiscordWebhookSink::new(&config.fetch.user_agent)?;
    let backend = MyMemoryBackend::new(&config.translation, &config.fetch.user_agent)?;

    let mut pipeline = RelayPipeline::load(config, source, Box::new(sink), Box::new(backend))?;
    pipeline.run().await
}
