//! Memoized machine translation.
//!
//! Source text is trimmed and cut to a fixed number of characters before it
//! is hashed or sent anywhere, so only that prefix is ever translated. The
//! cache is keyed by the blake3 digest of the prefix and persists across runs
//! without eviction. An empty answer from the backend is cached as the source
//! prefix, so the same text is never requested twice.
use crate::config::TranslationConfig;
use crate::state::{load_json, save_json};
use crate::traits::TranslationBackend;
use crate::types::{RelayError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_CHARS: usize = 350;

/// Persisted map of content hash → translated text.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl TranslationCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache file. Entries whose key is not a blake3 hex digest
    /// (an older md5-keyed file, say) can never be hit and are dropped.
    pub fn load(path: &Path) -> Self {
        let mut entries: BTreeMap<String, String> = load_json(path);
        let before = entries.len();
        entries.retain(|key, _| is_cache_key(key));
        if entries.len() < before {
            warn!(
                "Dropped {} cache entries with foreign keys from {}",
                before - entries.len(),
                path.display()
            );
        }
        info!("Loaded {} cached translations from {}", entries.len(), path.display());
        Self {
            entries,
            path: Some(path.to_path_buf()),
        }
    }

    pub fn key_for(text: &str) -> String {
        blake3::hash(text.as_bytes()).to_hex().to_string()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: String, translated: String) {
        self.entries.insert(key, translated);
    }

    pub fn persist(&self) -> Result<()> {
        if let Some(path) = &self.path {
            save_json(path, &self.entries)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_cache_key(key: &str) -> bool {
    key.len() == 64 && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Outcome of a translation request, kept so callers can log fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translated {
    Empty,
    Cached(String),
    Fresh(String),
    /// The backend answered with nothing usable; the truncated source is
    /// returned as-is and remembered in its place.
    Untranslated(String),
}

impl Translated {
    pub fn text(&self) -> &str {
        match self {
            Translated::Empty => "",
            Translated::Cached(t) | Translated::Fresh(t) | Translated::Untranslated(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Translated::Empty => String::new(),
            Translated::Cached(t) | Translated::Fresh(t) | Translated::Untranslated(t) => t,
        }
    }
}

pub struct Translator<'a> {
    backend: &'a dyn TranslationBackend,
    cache: &'a mut TranslationCache,
    max_chars: usize,
}

impl<'a> Translator<'a> {
    pub fn new(
        backend: &'a dyn TranslationBackend,
        cache: &'a mut TranslationCache,
        max_chars: usize,
    ) -> Self {
        Self { backend, cache, max_chars }
    }

    /// Translate `text`, consulting the cache first.
    ///
    /// A transport failure is returned as `RelayError::Translation`; it is up
    /// to the caller to fall back to the source text.
    pub async fn translate(&mut self, text: &str) -> Result<Translated> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Translated::Empty);
        }

        let short = truncate_chars(text, self.max_chars);
        let key = TranslationCache::key_for(short);

        if let Some(hit) = self.cache.get(&key) {
            debug!("Translation cache hit for {}", &key[..12]);
            return Ok(Translated::Cached(hit.to_string()));
        }

        match self.backend.translate(short).await? {
            Some(translated) if !translated.trim().is_empty() => {
                self.cache.insert(key, translated.clone());
                Ok(Translated::Fresh(translated))
            }
            _ => {
                warn!("{} returned no text, caching source text", self.backend.backend_name());
                self.cache.insert(key, short.to_string());
                Ok(Translated::Untranslated(short.to_string()))
            }
        }
    }

    /// Like `translate`, but a failed call degrades to the truncated source text.
    pub async fn translate_or_source(&mut self, text: &str) -> Translated {
        match self.translate(text).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation failed, delivering source text: {}", e);
                Translated::Untranslated(truncate_chars(text.trim(), self.max_chars).to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData", default)]
    response_data: Option<MyMemoryData>,
    #[serde(rename = "responseStatus", default)]
    response_status: Option<serde_json::Value>,
    #[serde(rename = "responseDetails", default)]
    response_details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText", default)]
    translated_text: Option<String>,
}

/// Client for the MyMemory translation API.
pub struct MyMemoryBackend {
    client: Client,
    endpoint: String,
    langpair: String,
    email: Option<String>,
}

impl MyMemoryBackend {
    pub fn new(config: &TranslationConfig, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            langpair: format!("{}|{}", config.source_lang, config.target_lang),
            email: config.email.clone(),
        })
    }
}

#[async_trait]
impl TranslationBackend for MyMemoryBackend {
    fn backend_name(&self) -> String {
        format!("MyMemory ({})", self.langpair)
    }

    async fn translate(&self, text: &str) -> Result<Option<String>> {
        let mut params = vec![("q", text), ("langpair", self.langpair.as_str())];
        if let Some(email) = self.email.as_deref() {
            params.push(("de", email));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| RelayError::Translation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Translation(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body: MyMemoryResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Translation(format!("malformed response: {}", e)))?;

        // The API reports quota and input errors in the body with a 200 transport status.
        let api_status = body.response_status.as_ref().and_then(|s| match s {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        });
        if let Some(code) = api_status.filter(|code| *code != 200) {
            return Err(RelayError::Translation(format!(
                "API status {}: {}",
                code,
                body.response_details.unwrap_or_default()
            )));
        }

        Ok(body
            .response_data
            .and_then(|d| d.translated_text)
            .filter(|t| !t.trim().is_empty()))
    }
}
