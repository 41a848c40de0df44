//! Listing and metadata types returned by object stores

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

/// Prefix applied to user metadata when rendered as headers
pub const USER_METADATA_PREFIX: &str = "x-amz-meta-";

/// One page of a delimiter listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Full common prefixes ("virtual directories"), each ending in the delimiter
    pub common_prefixes: Vec<String>,

    /// Full keys of the objects directly under the prefix
    pub keys: Vec<String>,

    /// Token for the next page, `None` on the last page
    pub next_continuation: Option<String>,
}

impl ListPage {
    /// Check if more pages follow this one
    pub fn is_truncated(&self) -> bool {
        self.next_continuation.is_some()
    }
}

/// Metadata of a single object, as returned by a HEAD call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Object size in bytes
    pub content_length: u64,

    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,

    /// Entity tag, quotes included as returned by the store
    pub e_tag: Option<String>,

    /// Last modification time
    pub last_modified: Option<DateTime<Utc>>,

    /// User metadata, keys lower-cased
    pub user_metadata: BTreeMap<String, String>,
}

impl ObjectMetadata {
    /// Create metadata for an object of `content_length` bytes
    pub fn new(content_length: u64) -> Self {
        Self {
            content_length,
            ..Default::default()
        }
    }

    /// Set the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the entity tag
    pub fn with_e_tag(mut self, e_tag: impl Into<String>) -> Self {
        self.e_tag = Some(e_tag.into());
        self
    }

    /// Set the last modification time
    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Add a user metadata entry (key is lower-cased)
    pub fn with_user_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key.to_lowercase(), value.into());
        self
    }

    /// Render the comparable header set
    ///
    /// `content-length` is always present. Optional headers appear only when
    /// set to a non-empty value. User metadata appears as `x-amz-meta-<key>`.
    pub fn headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();

        headers.insert("content-length".to_string(), self.content_length.to_string());

        let optional = [
            ("cache-control", &self.cache_control),
            ("content-disposition", &self.content_disposition),
            ("content-encoding", &self.content_encoding),
            ("content-language", &self.content_language),
            ("content-type", &self.content_type),
            ("etag", &self.e_tag),
        ];

        for (name, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                headers.insert(name.to_string(), value.to_string());
            }
        }

        for (key, value) in &self.user_metadata {
            headers.insert(
                format!("{}{}", USER_METADATA_PREFIX, key).to_lowercase(),
                value.clone(),
            );
        }

        headers
    }

    /// Last modification time formatted for reports
    pub fn last_modified_display(&self) -> Option<String> {
        self.last_modified.map(format_timestamp)
    }
}

/// Format a timestamp as RFC 3339 in UTC with automatic sub-second precision
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_headers_minimal() {
        let headers = ObjectMetadata::new(42).headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["content-length"], "42");
    }

    #[test]
    fn test_headers_full() {
        let meta = ObjectMetadata {
            cache_control: Some("max-age=60".into()),
            content_encoding: Some(String::new()),
            ..ObjectMetadata::new(10)
        }
        .with_content_type("text/plain")
        .with_e_tag("\"abc\"")
        .with_user_metadata("Owner", "ops");

        let headers = meta.headers();
        assert_eq!(headers["cache-control"], "max-age=60");
        assert_eq!(headers["content-type"], "text/plain");
        assert_eq!(headers["etag"], "\"abc\"");
        assert_eq!(headers["x-amz-meta-owner"], "ops");
        // Empty optional values count as absent
        assert!(!headers.contains_key("content-encoding"));
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(format_timestamp(ts), "2024-03-01T12:30:05Z");

        let ts = ts + chrono::Duration::milliseconds(250);
        assert_eq!(format_timestamp(ts), "2024-03-01T12:30:05.250Z");
    }

    #[test]
    fn test_list_page_truncation() {
        let mut page = ListPage::default();
        assert!(!page.is_truncated());
        page.next_continuation = Some("token".into());
        assert!(page.is_truncated());
    }
}
