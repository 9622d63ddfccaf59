use crate::traits::NotificationSink;
use crate::translation::truncate_chars;
use crate::types::{RelayError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Discord refuses messages longer than this.
pub const DISCORD_CONTENT_LIMIT: usize = 2000;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<Embed<'a>>,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    image: EmbedImage<'a>,
}

#[derive(Debug, Serialize)]
struct EmbedImage<'a> {
    url: &'a str,
}

/// Posts messages to Discord webhooks. No retries: a failed post stays
/// unseen and is picked up again on the next run.
pub struct DiscordWebhookSink {
    client: Client,
}

impl DiscordWebhookSink {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(25))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhookSink {
    async fn deliver(&self, destination: &str, text: &str, image_url: Option<&str>) -> Result<()> {
        let payload = WebhookPayload {
            content: truncate_chars(text, DISCORD_CONTENT_LIMIT),
            embeds: image_url
                .map(|url| vec![Embed { image: EmbedImage { url } }])
                .unwrap_or_default(),
        };

        let delivery_error = |reason: String| RelayError::Delivery {
            destination: destination.to_string(),
            reason,
        };

        let response = self
            .client
            .post(destination)
            .json(&payload)
            .send()
            .await
            .map_err(|e| delivery_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(delivery_error(format!("HTTP {}: {}", status, body.trim())));
        }

        debug!("Delivered {} chars to webhook", payload.content.chars().count());
        Ok(())
    }
}
