use crate::fetcher::Fetcher;
use crate::sources::html::{absolutize_protocol_relative, element_text, selector};
use crate::traits::SourceAdapter;
use crate::types::{FetchConfig, Post, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use url::Url;

const VK_BASE: &str = "https://vk.com";

fn wall_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/wall(-?\d+_\d+)").expect("wall id pattern is valid"))
}

/// Scrapes the public mobile page of a VK community wall.
///
/// The markup is not a stable interface. Anything this parser cannot make
/// sense of is skipped; a page without wall items yields an empty batch.
pub struct VkMobileSource {
    url: String,
    fetcher: Fetcher,
}

impl VkMobileSource {
    pub fn new(url: String, fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            url,
            fetcher: Fetcher::new(fetch_config)?,
        })
    }
}

#[async_trait]
impl SourceAdapter for VkMobileSource {
    fn source_name(&self) -> String {
        format!("vk_mobile ({})", self.url)
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Post>> {
        info!("Connecting to VK mobile page {}", self.url);
        let page = self.fetcher.get_text(&self.url, &[]).await?;
        info!("VK mobile answered HTTP {} in {}ms", page.http_status, page.response_time_ms);

        parse_wall_page(&page.content, &self.url, limit)
    }
}

/// Pull posts out of a mobile wall page, newest first as the page lists them.
pub fn parse_wall_page(html: &str, page_url: &str, limit: usize) -> Result<Vec<Post>> {
    let document = Html::parse_document(html);
    let item_selector = selector(".wall_item")?;
    let link_selector = selector(r#"a[href*="/wall"]"#)?;
    let img_selector = selector("img")?;
    let base = Url::parse(VK_BASE)?;

    let items: Vec<_> = document.select(&item_selector).collect();
    info!("Found {} .wall_item elements", items.len());
    if items.is_empty() {
        warn!("No wall items on {}, the page layout may have changed", page_url);
    }

    let mut posts = Vec::new();
    for item in items {
        let text = element_text(item);
        if !text.contains('#') {
            debug!("Skipping wall item without hashtags");
            continue;
        }

        let href = item
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or("");

        let id = wall_id_pattern()
            .captures(href)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| blake3::hash(text.as_bytes()).to_hex().to_string());

        let url = if href.is_empty() {
            page_url.to_string()
        } else {
            base.join(href).map(String::from).unwrap_or_else(|_| page_url.to_string())
        };

        let image_url = item
            .select(&img_selector)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(absolutize_protocol_relative);

        posts.push(Post {
            id,
            url,
            text,
            image_url,
            published_at: None,
        });
    }

    posts.truncate(limit);
    Ok(posts)
}
