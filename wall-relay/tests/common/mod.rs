#![allow(dead_code)]

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};
use wall_relay::{
    NotificationSink, Post, RelayError, Result, SeenSet, SourceAdapter, TranslationBackend,
};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Source that returns a fixed batch, newest first.
#[derive(Clone, Default)]
pub struct FakeSource {
    pub posts: Arc<Mutex<Vec<Post>>>,
    pub fail: Arc<Mutex<bool>>,
    pub requested_limits: Arc<Mutex<Vec<usize>>>,
}

impl FakeSource {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        let source = Self::default();
        *source.posts.lock().unwrap() = posts;
        source
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl SourceAdapter for FakeSource {
    fn source_name(&self) -> String {
        "fake".to_string()
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Post>> {
        self.requested_limits.lock().unwrap().push(limit);
        if *self.fail.lock().unwrap() {
            return Err(RelayError::Fetch("source unreachable".to_string()));
        }
        Ok(self.posts.lock().unwrap().iter().take(limit).cloned().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub destination: String,
    pub text: String,
    pub image_url: Option<String>,
}

/// Sink that records deliveries and rejects any destination listed in `reject`.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub deliveries: Arc<Mutex<Vec<Delivery>>>,
    pub attempts: Arc<Mutex<usize>>,
    pub reject: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn rejecting(&self, destination: &str) {
        self.reject.lock().unwrap().push(destination.to_string());
    }

    pub fn accept_all(&self) {
        self.reject.lock().unwrap().clear();
    }

    pub fn delivered(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, destination: &str, text: &str, image_url: Option<&str>) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if self.reject.lock().unwrap().iter().any(|d| d == destination) {
            return Err(RelayError::Delivery {
                destination: destination.to_string(),
                reason: "HTTP 500".to_string(),
            });
        }
        self.deliveries.lock().unwrap().push(Delivery {
            destination: destination.to_string(),
            text: text.to_string(),
            image_url: image_url.map(str::to_string),
        });
        Ok(())
    }
}

/// Sink that reads the seen ledger from disk at every delivery, recording
/// ids present in the file at that moment.
#[derive(Clone)]
pub struct LedgerSnapshotSink {
    pub state_path: PathBuf,
    pub snapshots: Arc<Mutex<Vec<Vec<String>>>>,
}

impl LedgerSnapshotSink {
    pub fn new(state_path: PathBuf) -> Self {
        Self {
            state_path,
            snapshots: Arc::default(),
        }
    }

    pub fn snapshots(&self) -> Vec<Vec<String>> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for LedgerSnapshotSink {
    async fn deliver(&self, _destination: &str, _text: &str, _image: Option<&str>) -> Result<()> {
        let ledger = SeenSet::load(&self.state_path);
        let on_disk: Vec<String> = ledger.iter().map(str::to_string).collect();
        self.snapshots.lock().unwrap().push(on_disk);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendMode {
    Prefix,
    Empty,
    Fail,
}

/// Translation backend that prefixes its input with `FR:` and counts calls.
#[derive(Clone)]
pub struct CountingBackend {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub mode: Arc<Mutex<BackendMode>>,
}

impl Default for CountingBackend {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            mode: Arc::new(Mutex::new(BackendMode::Prefix)),
        }
    }
}

impl CountingBackend {
    pub fn set_mode(&self, mode: BackendMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TranslationBackend for CountingBackend {
    fn backend_name(&self) -> String {
        "counting".to_string()
    }

    async fn translate(&self, text: &str) -> Result<Option<String>> {
        self.calls.lock().unwrap().push(text.to_string());
        let mode = *self.mode.lock().unwrap();
        match mode {
            BackendMode::Prefix => Ok(Some(format!("FR: {}", text))),
            BackendMode::Empty => Ok(None),
            BackendMode::Fail => Err(RelayError::Translation("connection reset".to_string())),
        }
    }
}
