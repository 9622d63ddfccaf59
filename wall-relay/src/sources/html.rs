//! Small helpers over `scraper` shared by the HTML-bearing adapters.
use crate::types::{RelayError, Result};
use scraper::{ElementRef, Html, Selector};

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| RelayError::Parse(format!("bad selector {}: {}", css, e)))
}

/// Visible text of an element: every text node trimmed, empty ones dropped,
/// the rest joined with single spaces.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plain text of an HTML snippet such as an RSS description.
pub fn fragment_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    element_text(fragment.root_element())
}

/// `src` of the first `<img>` in an HTML snippet.
pub fn first_image_src(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let img = selector("img").ok()?;
    fragment
        .select(&img)
        .find_map(|el| el.value().attr("src"))
        .map(absolutize_protocol_relative)
}

/// `//host/path` → `https://host/path`
pub fn absolutize_protocol_relative(src: &str) -> String {
    match src.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => src.to_string(),
    }
}
