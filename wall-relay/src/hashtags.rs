use crate::types::HashtagSet;
use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

fn hashtag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"#([\p{L}\p{M}\p{N}_.]+)").expect("hashtag pattern is valid")
    })
}

/// Canonical form of a tag: trimmed, NFC-composed, lowercased, with `ё`
/// folded into `е`.
///
/// Route keys and extracted tags both go through here, so `#Озёро` and
/// `#озеро` compare equal whether the `ё` arrives precomposed or as `е`
/// plus a combining diaeresis.
pub fn normalize(tag: &str) -> String {
    tag.trim().nfc().collect::<String>().to_lowercase().replace('ё', "е")
}

/// Extract every `#tag` from `text` in order of appearance.
///
/// Duplicates are kept; routing only looks at the first tag that matches.
pub fn extract(text: &str) -> HashtagSet {
    hashtag_pattern()
        .captures_iter(text)
        .map(|caps| normalize(&format!("#{}", &caps[1])))
        .collect()
}
