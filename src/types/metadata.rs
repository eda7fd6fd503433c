//! Link preview metadata types.
//!
//! The serde shape mirrors the payload posted by page-scraping scripts:
//! `{"title": ..., "description": ..., "image": {"url": ...}}`, with every
//! field optional.

use serde::{Deserialize, Serialize};

/// Preview image reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Absolute image URL, if the page declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Preview metadata for a single page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    /// Page title (e.g. `og:title` or `<title>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Page description (e.g. `og:description`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Preview image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

impl LinkMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the image URL.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image = Some(ImageRef {
            url: Some(url.into()),
        });
        self
    }

    /// Image URL, if present.
    pub fn image_url(&self) -> Option<&str> {
        self.image.as_ref().and_then(|image| image.url.as_deref())
    }

    /// Parse a scraper payload.
    pub fn from_json(payload: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Whether this record is worth caching and showing.
    ///
    /// At least one of title, description or image URL must contain
    /// something other than whitespace.
    pub fn is_usable(&self) -> bool {
        [
            self.title.as_deref(),
            self.description.as_deref(),
            self.image_url(),
        ]
        .into_iter()
        .flatten()
        .any(|field| !field.trim().is_empty())
    }
}

/// A cached URL and its metadata, as returned by cache snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub metadata: LinkMetadata,
}
