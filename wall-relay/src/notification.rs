use crate::routing::Classification;
use crate::types::{Notification, Post};

/// Build the outbound message for `post` once it is classified and translated.
pub fn build(post: &Post, classification: &Classification, translated: &str) -> Notification {
    Notification {
        post_id: post.id.clone(),
        destination: classification.destination.clone(),
        label: classification.label.clone(),
        tag: classification.tag.clone(),
        source_url: post.url.clone(),
        body: translated.to_string(),
        image_url: post.image_url.clone(),
    }
}

/// Render a notification as webhook text.
pub fn render(notification: &Notification) -> String {
    let tag = notification.tag.as_deref().unwrap_or("-");
    let mut text = format!(
        "🎣 Nouvelle capture\n📍 {} ({})\n🔗 {}",
        notification.label, tag, notification.source_url
    );
    if !notification.body.is_empty() {
        text.push_str("\n\n");
        text.push_str(&notification.body);
    }
    text
}
