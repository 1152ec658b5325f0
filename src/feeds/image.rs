//! Image URL extraction for feed entries.

use super::parser::FeedEntry;
use crate::utils::try_each;
use once_cell::sync::Lazy;
use regex::Regex;

static IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("valid img regex"));

fn from_enclosure(entry: &FeedEntry) -> Option<String> {
    entry.enclosure_url.clone()
}

fn from_media_content(entry: &FeedEntry) -> Option<String> {
    entry.media_content_url.clone()
}

fn from_media_thumbnail(entry: &FeedEntry) -> Option<String> {
    entry.media_thumbnail_url.clone()
}

fn from_embedded_html(entry: &FeedEntry) -> Option<String> {
    let html = entry
        .content
        .as_deref()
        .or(entry.description.as_deref())?;
    IMG_SRC
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First image URL found: enclosure, `media:content`, `media:thumbnail`, then
/// the first `<img src>` in the entry's HTML.
pub fn extract_image_url(entry: &FeedEntry) -> Option<String> {
    try_each(
        entry,
        &[
            from_enclosure,
            from_media_content,
            from_media_thumbnail,
            from_embedded_html,
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> FeedEntry {
        FeedEntry {
            title: "T".to_string(),
            link: "https://a.example/".to_string(),
            ..FeedEntry::default()
        }
    }

    #[test]
    fn test_enclosure_wins() {
        let e = FeedEntry {
            enclosure_url: Some("https://img.example/enc.jpg".to_string()),
            media_content_url: Some("https://img.example/media.jpg".to_string()),
            ..entry()
        };
        assert_eq!(extract_image_url(&e).as_deref(), Some("https://img.example/enc.jpg"));
    }

    #[test]
    fn test_media_order() {
        let e = FeedEntry {
            media_content_url: Some("https://img.example/media.jpg".to_string()),
            media_thumbnail_url: Some("https://img.example/thumb.jpg".to_string()),
            ..entry()
        };
        assert_eq!(extract_image_url(&e).as_deref(), Some("https://img.example/media.jpg"));

        let thumb_only = FeedEntry {
            media_thumbnail_url: Some("https://img.example/thumb.jpg".to_string()),
            ..entry()
        };
        assert_eq!(
            extract_image_url(&thumb_only).as_deref(),
            Some("https://img.example/thumb.jpg")
        );
    }

    #[test]
    fn test_embedded_img_fallback() {
        let e = FeedEntry {
            description: Some(r#"<p>Text <IMG class="x" SRC='https://img.example/inline.png'></p>"#.to_string()),
            ..entry()
        };
        assert_eq!(extract_image_url(&e).as_deref(), Some("https://img.example/inline.png"));
    }

    #[test]
    fn test_no_image() {
        let e = FeedEntry {
            description: Some("plain text".to_string()),
            ..entry()
        };
        assert!(extract_image_url(&e).is_none());
    }
}
