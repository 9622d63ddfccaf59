use crate::fetcher::Fetcher;
use crate::traits::SourceAdapter;
use crate::types::{FetchConfig, Post, RelayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

const WALL_GET_URL: &str = "https://api.vk.com/method/wall.get";

#[derive(Debug, Deserialize)]
struct WallGetEnvelope {
    #[serde(default)]
    response: Option<WallGetResponse>,
    #[serde(default)]
    error: Option<VkApiError>,
}

#[derive(Debug, Deserialize)]
struct WallGetResponse {
    #[serde(default)]
    items: Vec<WallItem>,
}

#[derive(Debug, Deserialize)]
struct VkApiError {
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct WallItem {
    id: i64,
    owner_id: i64,
    #[serde(default)]
    date: i64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    photo: Option<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    #[serde(default)]
    sizes: Vec<PhotoSize>,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

impl WallItem {
    fn into_post(self) -> Post {
        let id = format!("{}_{}", self.owner_id, self.id);
        let image_url = self
            .attachments
            .iter()
            .filter(|a| a.kind == "photo")
            .find_map(|a| a.photo.as_ref())
            .and_then(|photo| {
                photo
                    .sizes
                    .iter()
                    .max_by_key(|s| u64::from(s.width) * u64::from(s.height))
            })
            .map(|size| size.url.clone());

        Post {
            url: format!("https://vk.com/wall{}", id),
            id,
            text: self.text,
            image_url,
            published_at: DateTime::<Utc>::from_timestamp(self.date, 0),
        }
    }
}

/// Where `wall.get` should read from.
#[derive(Debug, Clone)]
pub enum WallOwner {
    Domain(String),
    OwnerId(i64),
}

/// Authenticated VK `wall.get` client.
pub struct VkApiSource {
    owner: WallOwner,
    access_token: String,
    api_version: String,
    endpoint: String,
    fetcher: Fetcher,
}

impl VkApiSource {
    pub fn new(
        owner: WallOwner,
        access_token: String,
        api_version: String,
        fetch_config: FetchConfig,
    ) -> Result<Self> {
        Ok(Self {
            owner,
            access_token,
            api_version,
            endpoint: WALL_GET_URL.to_string(),
            fetcher: Fetcher::new(fetch_config)?,
        })
    }

    /// Point the client at another `wall.get` URL (a proxy or a test server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SourceAdapter for VkApiSource {
    fn source_name(&self) -> String {
        match &self.owner {
            WallOwner::Domain(domain) => format!("vk_api ({})", domain),
            WallOwner::OwnerId(id) => format!("vk_api ({})", id),
        }
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Post>> {
        let count = limit.to_string();
        let owner_id;
        let mut query: Vec<(&str, &str)> = vec![
            ("count", count.as_str()),
            ("access_token", self.access_token.as_str()),
            ("v", self.api_version.as_str()),
        ];
        match &self.owner {
            WallOwner::Domain(domain) => query.push(("domain", domain.as_str())),
            WallOwner::OwnerId(id) => {
                owner_id = id.to_string();
                query.push(("owner_id", owner_id.as_str()));
            }
        }

        let page = self.fetcher.get_text(&self.endpoint, &query).await?;
        let posts = parse_wall_get(&page.content, limit)?;
        info!("{}: {} posts", self.source_name(), posts.len());
        Ok(posts)
    }
}

/// Decode a `wall.get` body into posts, newest first.
pub fn parse_wall_get(body: &str, limit: usize) -> Result<Vec<Post>> {
    let envelope: WallGetEnvelope = serde_json::from_str(body)
        .map_err(|e| RelayError::Fetch(format!("malformed wall.get response: {}", e)))?;

    if let Some(err) = envelope.error {
        return Err(RelayError::Fetch(format!(
            "VK API error {}: {}",
            err.error_code, err.error_msg
        )));
    }
    let response = envelope
        .response
        .ok_or_else(|| RelayError::Fetch("wall.get response has no body".to_string()))?;

    let mut items = response.items;
    // Pinned posts come first regardless of age.
    items.sort_by(|a, b| b.date.cmp(&a.date));
    debug!("wall.get returned {} items", items.len());

    Ok(items.into_iter().take(limit).map(WallItem::into_post).collect())
}
