//! Relay configuration, loaded once per run from a JSON file.
//!
//! Routes are keyed by hashtag in a `routes` object next to `default_webhook`;
//! each route may carry `lake_fr` (or `label`) and an optional `webhook`.
use crate::translation::DEFAULT_MAX_CHARS;
use crate::types::{FetchConfig, RelayError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub default_webhook: Option<String>,
    #[serde(default)]
    pub routes: BTreeMap<String, RouteConfig>,
    #[serde(default = "default_unclassified_label")]
    pub unclassified_label: String,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub limits: RunLimits,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    #[serde(alias = "lake_fr")]
    pub label: Option<String>,
    #[serde(default)]
    pub webhook: Option<String>,
}

/// Which wall backend to pull from. The tag is `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    VkApi {
        #[serde(default)]
        domain: Option<String>,
        #[serde(default)]
        owner_id: Option<i64>,
        #[serde(default)]
        access_token: Option<String>,
        #[serde(default = "default_vk_api_version")]
        api_version: String,
    },
    VkMobile {
        #[serde(default = "default_vk_mobile_url")]
        url: String,
    },
    Rss {
        url: String,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::VkMobile {
            url: default_vk_mobile_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub endpoint: String,
    pub source_lang: String,
    pub target_lang: String,
    pub email: Option<String>,
    pub max_chars: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mymemory.translated.net/get".to_string(),
            source_lang: "ru".to_string(),
            target_lang: "fr".to_string(),
            email: None,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    pub batch_size: usize,
    pub max_per_run: usize,
    pub delay_ms: u64,
    pub seen_cap: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            batch_size: 12,
            max_per_run: 3,
            delay_ms: 1000,
            seen_cap: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub seen_path: PathBuf,
    pub cache_path: PathBuf,
    pub persist_each_delivery: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            seen_path: PathBuf::from("state.json"),
            cache_path: PathBuf::from("translate_cache.json"),
            persist_each_delivery: true,
        }
    }
}

fn default_unclassified_label() -> String {
    "unclassified".to_string()
}

fn default_vk_api_version() -> String {
    "5.199".to_string()
}

fn default_vk_mobile_url() -> String {
    "https://m.vk.com/pp4farmtrof".to_string()
}

impl RelayConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| RelayError::Config(format!("invalid configuration: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_json(&raw)?;
        info!("Loaded configuration from {} ({} routes)", path.display(), config.routes.len());
        Ok(config)
    }

    /// The fallback webhook. Every run needs one, so its absence is fatal.
    pub fn default_destination(&self) -> Result<&str> {
        let webhook = self
            .default_webhook
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .ok_or_else(|| RelayError::Config("default_webhook is missing".to_string()))?;
        Url::parse(webhook)
            .map_err(|e| RelayError::Config(format!("default_webhook is not a valid URL: {}", e)))?;
        Ok(webhook)
    }

    /// Check everything that must hold before any network or file I/O.
    pub fn validate(&self) -> Result<()> {
        self.default_destination()?;
        for (tag, route) in &self.routes {
            if let Some(webhook) = route.webhook.as_deref() {
                Url::parse(webhook).map_err(|e| {
                    RelayError::Config(format!("route {} has an invalid webhook: {}", tag, e))
                })?;
            }
        }
        if let SourceConfig::VkApi { domain: None, owner_id: None, .. } = self.source {
            return Err(RelayError::Config("vk_api source needs a domain or owner_id".to_string()));
        }
        debug!("Configuration validated");
        Ok(())
    }

    /// Fill in an API token supplied outside the file (CLI or environment).
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        if let (SourceConfig::VkApi { access_token, .. }, Some(token)) = (&mut self.source, token) {
            if access_token.is_none() {
                *access_token = Some(token);
            }
        }
        self
    }

    /// Relocate the state files under `dir`, keeping their file names.
    pub fn with_state_dir(mut self, dir: &Path) -> Self {
        let relocate = |path: &Path| match path.file_name() {
            Some(name) => dir.join(name),
            None => dir.join(path),
        };
        self.state.seen_path = relocate(&self.state.seen_path);
        self.state.cache_path = relocate(&self.state.cache_path);
        self
    }
}
