//! Link bricks: URL normalization and fetched page metadata.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::brick::LinkBrickData;
use crate::error::CoreError;

/// Maximum accepted length of a link URL.
pub const MAX_LINK_URL_LEN: usize = 2048;

/// Metadata describing a linked page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub favicon: Option<String>,
    pub image: Option<String>,
}

impl LinkMetadata {
    /// Link brick payload for `url` decorated with this metadata.
    pub fn into_brick_data(self, url: String) -> LinkBrickData {
        LinkBrickData {
            url,
            title: self.title,
            description: self.description,
            site_name: self.site_name,
            icon_url: self.favicon,
            image_url: self.image,
        }
    }
}

/// Fetches metadata for a link target.
#[async_trait]
pub trait LinkMetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<LinkMetadata, CoreError>;
}

/// Normalize user input into an absolute http(s) URL.
///
/// Surrounding whitespace is trimmed and `https://` is assumed when no scheme
/// is given.
pub fn normalize_link_url(input: &str) -> Result<String, CoreError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Link URL is required".to_string()));
    }
    if trimmed.len() > MAX_LINK_URL_LEN {
        return Err(CoreError::Validation(format!(
            "Link URL must be at most {MAX_LINK_URL_LEN} characters"
        )));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate)
        .map_err(|_| CoreError::Validation(format!("Invalid link URL '{trimmed}'")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(url.to_string()),
        _ => Err(CoreError::Validation(format!(
            "Invalid link URL '{trimmed}'. Only http and https links are supported"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_https() {
        assert_eq!(normalize_link_url("example.com").unwrap(), "https://example.com/");
        assert_eq!(
            normalize_link_url("  example.com/a?b=1 ").unwrap(),
            "https://example.com/a?b=1"
        );
    }

    #[test]
    fn test_normalize_keeps_http() {
        assert_eq!(normalize_link_url("http://example.com/x").unwrap(), "http://example.com/x");
    }

    #[test]
    fn test_normalize_rejects_other_schemes_and_garbage() {
        assert!(normalize_link_url("").is_err());
        assert!(normalize_link_url("   ").is_err());
        assert!(normalize_link_url("ftp://example.com").is_err());
        assert!(normalize_link_url("javascript://alert(1)").is_err());
        assert!(normalize_link_url("https://").is_err());
        assert!(normalize_link_url(&format!("a.com/{}", "x".repeat(MAX_LINK_URL_LEN))).is_err());
    }

    #[test]
    fn test_metadata_into_brick_data() {
        let data = LinkMetadata {
            title: Some("Example".into()),
            favicon: Some("https://example.com/favicon.ico".into()),
            ..LinkMetadata::default()
        }
        .into_brick_data("https://example.com/".into());
        assert_eq!(data.url, "https://example.com/");
        assert_eq!(data.title.as_deref(), Some("Example"));
        assert_eq!(data.icon_url.as_deref(), Some("https://example.com/favicon.ico"));
        assert_eq!(data.image_url, None);
    }
}
