mod common;

use common::{
    init_tracing, BackendMode, CountingBackend, FakeSource, LedgerSnapshotSink, RecordingSink,
};
use serde_json::json;
use std::path::Path;
use tracing::info;
use wall_relay::{
    Post, PostOutcome, RelayConfig, RelayError, RelayPipeline, SeenSet, TranslationCache,
    Translator,
};

const D0: &str = "https://discord.example/api/webhooks/default";
const D1: &str = "https://discord.example/api/webhooks/lac-nord";

fn config_with(dir: &Path, routes: serde_json::Value, max_per_run: usize) -> RelayConfig {
    let raw = json!({
        "default_webhook": D0,
        "routes": routes,
        "limits": {"delay_ms": 0, "max_per_run": max_per_run},
        "state": {
            "seen_path": dir.join("state.json"),
            "cache_path": dir.join("translate_cache.json")
        }
    });
    RelayConfig::from_json(&raw.to_string()).unwrap()
}

fn lac_nord_config(dir: &Path) -> RelayConfig {
    config_with(dir, json!({"#LacNord": {"lake_fr": "Lac Nord", "webhook": D1}}), 3)
}

fn pipeline(
    config: &RelayConfig,
    source: &FakeSource,
    sink: &RecordingSink,
    backend: &CountingBackend,
) -> RelayPipeline {
    RelayPipeline::load(
        config,
        Box::new(source.clone()),
        Box::new(sink.clone()),
        Box::new(backend.clone()),
    )
    .unwrap()
}

fn post(id: &str, text: &str) -> Post {
    Post::new(id, format!("https://vk.com/wall{}", id), text)
}

#[tokio::test]
async fn routes_tagged_post_and_defaults_untagged_one() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = lac_nord_config(dir.path());

    // Newest first, as adapters return them.
    let source = FakeSource::with_posts(vec![
        post("-1_2", "pas de tag ici"),
        post("-1_1", "Super session #LacNord aujourd'hui"),
    ]);
    let sink = RecordingSink::default();
    let backend = CountingBackend::default();

    let report = pipeline(&config, &source, &sink, &backend).run().await.unwrap();
    info!("report: {:?}", report);

    assert_eq!(report.fetched, 2);
    assert_eq!(report.sent, 2);
    assert!(!report.has_failures());

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].destination, D1);
    assert!(delivered[0].text.contains("Lac Nord (#lacnord)"));
    assert!(delivered[0].text.contains("https://vk.com/wall-1_1"));
    assert!(delivered[0].text.contains("FR: Super session #LacNord aujourd'hui"));
    assert_eq!(delivered[1].destination, D0);
    assert!(delivered[1].text.contains("unclassified"));

    let seen = SeenSet::load(&dir.path().join("state.json"));
    assert!(seen.contains("-1_1"));
    assert!(seen.contains("-1_2"));
    assert_eq!(seen.iter().collect::<Vec<_>>(), vec!["-1_1", "-1_2"]);
}

#[tokio::test]
async fn second_run_over_same_batch_delivers_nothing() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = lac_nord_config(dir.path());
    let source =
        FakeSource::with_posts(vec![post("-1_2", "второй #LacNord"), post("-1_1", "первый")]);
    let sink = RecordingSink::default();
    let backend = CountingBackend::default();

    let first = pipeline(&config, &source, &sink, &backend).run().await.unwrap();
    assert_eq!(first.sent, 2);

    let second = pipeline(&config, &source, &sink, &backend).run().await.unwrap();
    assert_eq!(second.sent, 0);
    assert_eq!(second.skipped_seen, 2);
    assert!(second.outcomes.iter().all(|(_, o)| *o == PostOutcome::AlreadySeen));
    assert_eq!(sink.delivered().len(), 2);
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn seen_posts_are_never_translated_or_delivered() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("state.json"), r#"{"seen": ["-1_1"]}"#).unwrap();
    let config = lac_nord_config(dir.path());

    let source =
        FakeSource::with_posts(vec![post("-1_2", "новый пост"), post("-1_1", "старый #LacNord")]);
    let sink = RecordingSink::default();
    let backend = CountingBackend::default();

    let report = pipeline(&config, &source, &sink, &backend).run().await.unwrap();

    assert_eq!(report.skipped_seen, 1);
    assert_eq!(report.sent, 1);
    assert_eq!(*backend.calls.lock().unwrap(), vec!["новый пост".to_string()]);
    assert_eq!(*sink.attempts.lock().unwrap(), 1);
    assert_eq!(sink.delivered()[0].destination, D0);
}

#[tokio::test]
async fn earliest_routed_tag_wins() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let da = "https://discord.example/api/webhooks/a";
    let db = "https://discord.example/api/webhooks/b";
    let config = config_with(
        dir.path(),
        json!({"#a": {"label": "A", "webhook": da}, "#b": {"label": "B", "webhook": db}}),
        3,
    );
    let source = FakeSource::with_posts(vec![post("-1_1", "#b puis #a")]);
    let sink = RecordingSink::default();

    pipeline(&config, &source, &sink, &CountingBackend::default()).run().await.unwrap();

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].destination, db);
    assert!(delivered[0].text.contains("B (#b)"));
}

#[tokio::test]
async fn route_matches_any_spelling_variant() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = config_with(dir.path(), json!({"#Озёро": {"label": "Lac", "webhook": D1}}), 3);
    let source = FakeSource::with_posts(vec![
        post("-1_3", "#озеро"),
        post("-1_2", "#Озеро"),
        post("-1_1", "#ОЗЁРО"),
    ]);
    let sink = RecordingSink::default();

    pipeline(&config, &source, &sink, &CountingBackend::default()).run().await.unwrap();

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 3);
    assert!(delivered.iter().all(|d| d.destination == D1));
}

#[tokio::test]
async fn identical_text_is_translated_once_across_runs() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = lac_nord_config(dir.path());
    let text = "Щука на 5 кг #LacNord";
    let sink = RecordingSink::default();
    let backend = CountingBackend::default();

    let source = FakeSource::with_posts(vec![post("-1_2", text), post("-1_1", text)]);
    pipeline(&config, &source, &sink, &backend).run().await.unwrap();
    assert_eq!(backend.call_count(), 1);

    let later = FakeSource::with_posts(vec![post("-1_3", &format!("  {}  ", text))]);
    pipeline(&config, &later, &sink, &backend).run().await.unwrap();
    assert_eq!(backend.call_count(), 1);

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 3);
    assert!(delivered.iter().all(|d| d.text.ends_with(&format!("FR: {}", text))));
}

#[tokio::test]
async fn only_truncated_prefix_is_translated() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = lac_nord_config(dir.path());
    let long = format!("{}{}", "я".repeat(350), "хвост который не переводится");
    let backend = CountingBackend::default();

    let source = FakeSource::with_posts(vec![post("-1_1", &long)]);
    pipeline(&config, &source, &RecordingSink::default(), &backend)
        .run()
        .await
        .unwrap();

    let calls = backend.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].chars().count(), 350);
    assert!(!calls[0].contains("хвост"));
}

#[tokio::test]
async fn per_run_cap_defers_remaining_posts() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = config_with(dir.path(), json!({}), 3);
    let batch: Vec<Post> = (1..=5)
        .rev()
        .map(|i| post(&format!("-1_{}", i), &format!("post {}", i)))
        .collect();
    let source = FakeSource::with_posts(batch);
    let sink = RecordingSink::default();
    let backend = CountingBackend::default();

    let first = pipeline(&config, &source, &sink, &backend).run().await.unwrap();
    assert_eq!(first.sent, 3);
    let seen = SeenSet::load(&dir.path().join("state.json"));
    assert_eq!(seen.iter().collect::<Vec<_>>(), vec!["-1_1", "-1_2", "-1_3"]);

    let second = pipeline(&config, &source, &sink, &backend).run().await.unwrap();
    assert_eq!(second.sent, 2);
    let urls: Vec<_> = sink
        .delivered()
        .iter()
        .map(|d| d.text.lines().nth(2).unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        urls,
        (1..=5).map(|i| format!("🔗 https://vk.com/wall-1_{}", i)).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn failed_delivery_is_retried_next_run() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = lac_nord_config(dir.path());
    let source =
        FakeSource::with_posts(vec![post("-1_2", "sans tag"), post("-1_1", "#lacnord prise")]);
    let sink = RecordingSink::default();
    sink.rejecting(D1);
    let backend = CountingBackend::default();

    let first = pipeline(&config, &source, &sink, &backend).run().await.unwrap();
    assert_eq!(first.failed, 1);
    assert_eq!(first.sent, 1);
    assert!(first.has_failures());
    assert!(matches!(first.outcomes[0].1, PostOutcome::DeliveryFailed { .. }));

    let seen = SeenSet::load(&dir.path().join("state.json"));
    assert!(!seen.contains("-1_1"));
    assert!(seen.contains("-1_2"));

    sink.accept_all();
    let second = pipeline(&config, &source, &sink, &backend).run().await.unwrap();
    assert_eq!(second.sent, 1);
    assert_eq!(second.skipped_seen, 1);
    assert_eq!(sink.delivered().last().unwrap().destination, D1);
    // The failed post's translation was cached on the first attempt.
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn fetch_failure_leaves_state_untouched() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let original = r#"{"seen": ["-1_1"]}"#;
    std::fs::write(&state_path, original).unwrap();
    let config = lac_nord_config(dir.path());

    let source = FakeSource::with_posts(vec![post("-1_2", "новый")]);
    source.set_failing(true);
    let sink = RecordingSink::default();

    let result = pipeline(&config, &source, &sink, &CountingBackend::default()).run().await;

    assert!(matches!(result, Err(RelayError::Fetch(_))));
    assert_eq!(std::fs::read_to_string(&state_path).unwrap(), original);
    assert!(!dir.path().join("translate_cache.json").exists());
    assert_eq!(*sink.attempts.lock().unwrap(), 0);
}

#[tokio::test]
async fn missing_default_destination_aborts_before_fetch() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let raw = json!({
        "routes": {"#lacnord": {"label": "Lac Nord", "webhook": D1}},
        "state": {"seen_path": dir.path().join("state.json")}
    });
    let config = RelayConfig::from_json(&raw.to_string()).unwrap();
    let source = FakeSource::default();

    let result = RelayPipeline::load(
        &config,
        Box::new(source.clone()),
        Box::new(RecordingSink::default()),
        Box::new(CountingBackend::default()),
    );

    assert!(matches!(result, Err(RelayError::Config(_))));
    assert!(source.requested_limits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn translation_problems_fall_back_to_source_text() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = lac_nord_config(dir.path());
    let sink = RecordingSink::default();
    let backend = CountingBackend::default();

    backend.set_mode(BackendMode::Fail);
    let failing = FakeSource::with_posts(vec![post("-1_1", "Окунь #LacNord")]);
    let report = pipeline(&config, &failing, &sink, &backend).run().await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(report.translation_fallbacks, 1);
    assert!(sink.delivered()[0].text.ends_with("Окунь #LacNord"));

    backend.set_mode(BackendMode::Empty);
    let empty = FakeSource::with_posts(vec![post("-1_2", "Лещ")]);
    let mut pipe = pipeline(&config, &empty, &sink, &backend);
    let report = pipe.run().await.unwrap();
    assert_eq!(report.sent, 1);
    assert!(sink.delivered()[1].text.ends_with("Лещ"));
    assert_eq!(pipe.cache().len(), 1);
}

#[tokio::test]
async fn empty_translation_is_requested_once() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = lac_nord_config(dir.path());
    let backend = CountingBackend::default();
    backend.set_mode(BackendMode::Empty);

    let mut cache = TranslationCache::in_memory();
    for _ in 0..3 {
        let mut translator = Translator::new(&backend, &mut cache, 350);
        let translated = translator.translate("Лещ").await.unwrap();
        assert_eq!(translated.text(), "Лещ");
    }
    assert_eq!(backend.call_count(), 1);

    let sink = RecordingSink::default();
    let first = FakeSource::with_posts(vec![post("-1_1", "Карп #LacNord")]);
    pipeline(&config, &first, &sink, &backend).run().await.unwrap();
    let second = FakeSource::with_posts(vec![post("-1_2", "Карп #LacNord")]);
    let report = pipeline(&config, &second, &sink, &backend).run().await.unwrap();

    assert_eq!(report.sent, 1);
    assert_eq!(backend.call_count(), 2);
    assert!(sink.delivered()[1].text.ends_with("Карп #LacNord"));
}

#[tokio::test]
async fn empty_run_still_writes_state() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = lac_nord_config(dir.path());
    let source = FakeSource::default();

    let report = pipeline(&config, &source, &RecordingSink::default(), &CountingBackend::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.sent, 0);
    assert_eq!(*source.requested_limits.lock().unwrap(), vec![12]);
    assert!(dir.path().join("state.json").exists());
    assert!(dir.path().join("translate_cache.json").exists());
}

#[tokio::test]
async fn image_is_forwarded_to_sink() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = lac_nord_config(dir.path());
    let pike = post("-1_1", "#lacnord").with_image("https://img.example/pike.jpg");
    let source = FakeSource::with_posts(vec![pike]);
    let sink = RecordingSink::default();

    pipeline(&config, &source, &sink, &CountingBackend::default()).run().await.unwrap();

    assert_eq!(sink.delivered()[0].image_url.as_deref(), Some("https://img.example/pike.jpg"));
}

async fn ledger_snapshots(persist_each_delivery: bool) -> Vec<Vec<String>> {
    let dir = tempfile::tempdir().unwrap();
    let mut config = lac_nord_config(dir.path());
    config.state.persist_each_delivery = persist_each_delivery;

    let source =
        FakeSource::with_posts(vec![post("-1_2", "второй"), post("-1_1", "первый #LacNord")]);
    let sink = LedgerSnapshotSink::new(dir.path().join("state.json"));
    let mut pipe = RelayPipeline::load(
        &config,
        Box::new(source),
        Box::new(sink.clone()),
        Box::new(CountingBackend::default()),
    )
    .unwrap();

    let report = pipe.run().await.unwrap();
    assert_eq!(report.sent, 2);
    sink.snapshots()
}

#[tokio::test]
async fn delivered_post_is_on_disk_before_next_delivery() {
    init_tracing();
    let snapshots = ledger_snapshots(true).await;

    assert_eq!(snapshots.len(), 2);
    assert!(snapshots[0].is_empty());
    assert_eq!(snapshots[1], vec!["-1_1"]);
}

#[tokio::test]
async fn without_incremental_checkpoints_ledger_waits_for_run_end() {
    init_tracing();
    let snapshots = ledger_snapshots(false).await;

    assert_eq!(snapshots.len(), 2);
    assert!(snapshots[1].is_empty());
}
