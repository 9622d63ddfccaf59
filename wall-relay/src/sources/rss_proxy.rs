use crate::fetcher::Fetcher;
use crate::sources::html::{first_image_src, fragment_text};
use crate::traits::SourceAdapter;
use crate::types::{FetchConfig, Post, RelayError, Result};
use async_trait::async_trait;
use feed_rs::parser;
use tracing::{debug, info};

/// A wall exposed as RSS/Atom by a proxy service (RSSHub and the like).
pub struct RssProxySource {
    url: String,
    fetcher: Fetcher,
}

impl RssProxySource {
    pub fn new(url: String, fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            url,
            fetcher: Fetcher::new(fetch_config)?,
        })
    }
}

#[async_trait]
impl SourceAdapter for RssProxySource {
    fn source_name(&self) -> String {
        if let Ok(parsed) = url::Url::parse(&self.url) {
            if let Some(domain) = parsed.domain() {
                return format!("rss ({})", domain);
            }
        }
        "rss".to_string()
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Post>> {
        info!("Pulling RSS proxy feed: {}", self.url);
        let page = self.fetcher.get_text(&self.url, &[]).await?;
        let posts = parse_feed(&page.content, limit)?;
        info!("Pulled {} posts from {}", posts.len(), self.url);
        Ok(posts)
    }
}

/// Turn an RSS/Atom document into posts, newest first.
pub fn parse_feed(content: &str, limit: usize) -> Result<Vec<Post>> {
    let feed = parser::parse(content.as_bytes())
        .map_err(|e| RelayError::Fetch(format!("Failed to parse feed: {}", e)))?;

    let mut posts: Vec<Post> = feed.entries.into_iter().filter_map(entry_to_post).collect();

    // Feeds are usually newest first already; only reorder when every entry is dated.
    if posts.iter().all(|p| p.published_at.is_some()) {
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    }

    posts.truncate(limit);
    Ok(posts)
}

fn entry_to_post(entry: feed_rs::model::Entry) -> Option<Post> {
    let url = match entry.links.first() {
        Some(link) => link.href.clone(),
        None => {
            debug!("Skipping feed entry {} without a link", entry.id);
            return None;
        }
    };
    let id = if entry.id.is_empty() { url.clone() } else { entry.id.clone() };

    let html = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()))
        .unwrap_or_default();

    let media_image = entry.media.iter().find_map(|media| {
        media
            .thumbnails
            .first()
            .map(|thumb| thumb.image.uri.clone())
            .or_else(|| media.content.iter().find_map(|c| c.url.as_ref().map(|u| u.to_string())))
    });

    Some(Post {
        id,
        url,
        text: fragment_text(&html),
        image_url: media_image.or_else(|| first_image_src(&html)),
        published_at: entry.published.or(entry.updated),
    })
}
