//! Metadata extraction from raw HTML.
//!
//! Regex based, like a scraping script injected into a page would be: it
//! reads `<meta>` tags and `<title>` without building a DOM.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use crate::types::{ImageRef, LinkMetadata};

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta regex"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z][a-z0-9_:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute regex")
});

static TITLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));

static CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\b[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:-]+)"#)
        .expect("valid charset regex")
});

const TITLE_KEYS: &[&str] = &["og:title", "twitter:title"];
const DESCRIPTION_KEYS: &[&str] = &["og:description", "description", "twitter:description"];
const IMAGE_KEYS: &[&str] = &[
    "og:image",
    "og:image:url",
    "og:image:secure_url",
    "twitter:image",
    "twitter:image:src",
];

/// Extract preview metadata from `html`, resolving the image against `page_url`.
pub(crate) fn extract(html: &str, page_url: &Url) -> LinkMetadata {
    let meta = meta_content(html);

    let title = first_of(&meta, TITLE_KEYS).or_else(|| title_tag(html));
    let description = first_of(&meta, DESCRIPTION_KEYS);
    let image = first_of(&meta, IMAGE_KEYS)
        .and_then(|src| resolve(page_url, &src))
        .map(|url| ImageRef { url: Some(url) });

    LinkMetadata {
        title,
        description,
        image,
    }
}

/// Map of `property`/`name` (lowercased) to `content`. First occurrence wins.
fn meta_content(html: &str) -> HashMap<String, String> {
    let mut found = HashMap::new();
    for tag in META_TAG.find_iter(html) {
        let mut key = None;
        let mut content = None;
        for caps in ATTRIBUTE.captures_iter(tag.as_str()) {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            match caps[1].to_ascii_lowercase().as_str() {
                "property" | "name" | "itemprop" if key.is_none() => {
                    key = Some(value.trim().to_ascii_lowercase());
                }
                "content" => content = Some(value),
                _ => {}
            }
        }
        if let (Some(key), Some(content)) = (key, content) {
            found.entry(key).or_insert_with(|| content.to_owned());
        }
    }
    found
}

fn first_of(meta: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| meta.get(*key))
        .map(|value| clean(value))
        .find(|value| !value.is_empty())
}

fn title_tag(html: &str) -> Option<String> {
    TITLE_TAG
        .captures(html)
        .map(|caps| clean(&caps[1]))
        .filter(|title| !title.is_empty())
}

/// Decode HTML entities and collapse whitespace.
fn clean(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Charset declared by `<meta charset>` or `http-equiv` in the first KiB.
pub(crate) fn declared_charset(body: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&body[..body.len().min(1024)]);
    CHARSET
        .captures(&head)
        .map(|caps| caps[1].to_ascii_lowercase())
}

fn resolve(page_url: &Url, src: &str) -> Option<String> {
    let url = page_url.join(src).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/articles/1").unwrap()
    }

    #[test]
    fn open_graph_tags() {
        let html = r#"
            <html><head>
              <title>Fallback</title>
              <meta property="og:title" content="OG Title">
              <meta property="og:description" content="OG description">
              <meta property="og:image" content="https://cdn.example.com/og.png">
            </head></html>"#;
        let metadata = extract(html, &page());

        assert_eq!(metadata.title.as_deref(), Some("OG Title"));
        assert_eq!(metadata.description.as_deref(), Some("OG description"));
        assert_eq!(metadata.image_url(), Some("https://cdn.example.com/og.png"));
    }

    #[test]
    fn content_before_property_and_single_quotes() {
        let html = r#"<meta content='Reversed' property='og:title' />"#;
        let metadata = extract(html, &page());
        assert_eq!(metadata.title.as_deref(), Some("Reversed"));
    }

    #[test]
    fn falls_back_to_title_tag_and_description_meta() {
        let html = r#"
            <title>
              Plain   page
            </title>
            <meta name="Description" content="Plain description">"#;
        let metadata = extract(html, &page());

        assert_eq!(metadata.title.as_deref(), Some("Plain page"));
        assert_eq!(metadata.description.as_deref(), Some("Plain description"));
        assert_eq!(metadata.image, None);
    }

    #[test]
    fn twitter_card_tags() {
        let html = r#"
            <meta name="twitter:title" content="Tweet title">
            <meta name="twitter:image" content="/img/card.jpg">"#;
        let metadata = extract(html, &page());

        assert_eq!(metadata.title.as_deref(), Some("Tweet title"));
        assert_eq!(metadata.image_url(), Some("https://example.com/img/card.jpg"));
    }

    #[test]
    fn resolves_relative_and_protocol_relative_images() {
        let relative = extract(r#"<meta property="og:image" content="cover.png">"#, &page());
        assert_eq!(
            relative.image_url(),
            Some("https://example.com/articles/cover.png")
        );

        let protocol_relative = extract(
            r#"<meta property="og:image" content="//cdn.example.com/c.png">"#,
            &page(),
        );
        assert_eq!(
            protocol_relative.image_url(),
            Some("https://cdn.example.com/c.png")
        );
    }

    #[test]
    fn ignores_non_http_images() {
        let metadata = extract(
            r#"<meta property="og:image" content="data:image/png;base64,AAAA">"#,
            &page(),
        );
        assert_eq!(metadata.image, None);
    }

    #[test]
    fn decodes_entities() {
        let html = r#"<meta property="og:title" content="Tom &amp; Jerry &quot;Live&quot; &#39;24">"#;
        let metadata = extract(html, &page());
        assert_eq!(metadata.title.as_deref(), Some(r#"Tom & Jerry "Live" '24"#));
    }

    #[test]
    fn decodes_numeric_and_named_entities() {
        let html = r#"<meta property="og:title" content="It&#8217;s a &#x201C;test&#x201D; &mdash; &eacute;t&eacute;">"#;
        let metadata = extract(html, &page());
        assert_eq!(metadata.title.as_deref(), Some("It’s a “test” — été"));
    }

    #[test]
    fn declared_charset_from_meta() {
        assert_eq!(
            declared_charset(br#"<head><meta charset="Shift_JIS"></head>"#).as_deref(),
            Some("shift_jis")
        );
        assert_eq!(
            declared_charset(
                br#"<meta http-equiv="Content-Type" content="text/html; charset=ISO-8859-1">"#
            )
            .as_deref(),
            Some("iso-8859-1")
        );
        assert_eq!(declared_charset(b"<title>none</title>"), None);
    }

    #[test]
    fn first_tag_wins_and_blank_values_fall_through() {
        let html = r#"
            <meta property="og:title" content="   ">
            <meta property="og:title" content="Second">
            <meta name="twitter:title" content="Twitter">"#;
        let metadata = extract(html, &page());
        // The first og:title is blank, so the twitter title is used.
        assert_eq!(metadata.title.as_deref(), Some("Twitter"));
    }

    #[test]
    fn page_without_metadata() {
        let metadata = extract("<html><body>hi</body></html>", &page());
        assert!(!metadata.is_usable());
    }
}
