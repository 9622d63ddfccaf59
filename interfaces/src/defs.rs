use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One item pulled from a source wall.
///
/// `id` is opaque and stable: fetching the same wall item again yields the
/// same id, which is what the seen ledger keys on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub url: String,
    pub text: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(id: impl Into<String>, url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            text: text.into(),
            image_url: None,
            published_at: None,
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// A formatted message ready for a sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub post_id: String,
    pub destination: String,
    pub label: String,
    pub tag: Option<String>,
    pub source_url: String,
    pub body: String,
    pub image_url: Option<String>,
}

// Object style note:
// A relay run is a short lived single-task process. Components load what they
// need at run start, hold it in memory for the run, and write it back at
// checkpoints. Nothing here is shared between concurrent runs.
