//! Header-level diff of two objects

use std::collections::{BTreeMap, HashSet};

/// Header names excluded from mismatch detection (case-insensitive)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredHeaders {
    names: HashSet<String>,
}

impl IgnoredHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore `name`
    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_lowercase());
    }

    /// Check whether `name` is ignored
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for IgnoredHeaders {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut ignored = Self::new();
        for name in iter {
            ignored.insert(name.as_ref());
        }
        ignored
    }
}

/// Headers of two objects split into agreeing and differing sets
///
/// Every header name appears in exactly one of the two maps. A differing
/// value pair uses an empty string for the side the header is absent on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderDiff {
    pub common: BTreeMap<String, String>,
    pub differing: BTreeMap<String, [String; 2]>,
}

impl HeaderDiff {
    /// Diff two header maps
    pub fn compute(first: &BTreeMap<String, String>, second: &BTreeMap<String, String>) -> Self {
        let mut diff = HeaderDiff::default();

        for (name, value1) in first {
            match second.get(name) {
                Some(value2) if value1 == value2 => {
                    diff.common.insert(name.clone(), value1.clone());
                }
                Some(value2) => {
                    diff.differing
                        .insert(name.clone(), [value1.clone(), value2.clone()]);
                }
                None => {
                    diff.differing
                        .insert(name.clone(), [value1.clone(), String::new()]);
                }
            }
        }

        for (name, value2) in second {
            if !first.contains_key(name) {
                diff.differing
                    .insert(name.clone(), [String::new(), value2.clone()]);
            }
        }

        diff
    }

    /// Check if any differing header is not ignored
    pub fn is_significant(&self, ignored: &IgnoredHeaders) -> bool {
        self.differing.keys().any(|name| !ignored.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_identical_headers() {
        let h = headers(&[("content-length", "10"), ("etag", "\"x\"")]);
        let diff = HeaderDiff::compute(&h, &h);

        assert_eq!(diff.common.len(), 2);
        assert!(diff.differing.is_empty());
        assert!(!diff.is_significant(&IgnoredHeaders::new()));
    }

    #[test]
    fn test_value_mismatch_and_one_sided() {
        let a = headers(&[
            ("content-length", "10"),
            ("content-type", "text/plain"),
            ("cache-control", "no-cache"),
        ]);
        let b = headers(&[
            ("content-length", "10"),
            ("content-type", "text/html"),
            ("x-amz-meta-owner", "ops"),
        ]);

        let diff = HeaderDiff::compute(&a, &b);
        assert_eq!(diff.common, headers(&[("content-length", "10")]));
        assert_eq!(
            diff.differing["content-type"],
            ["text/plain".to_string(), "text/html".to_string()]
        );
        assert_eq!(
            diff.differing["cache-control"],
            ["no-cache".to_string(), String::new()]
        );
        assert_eq!(
            diff.differing["x-amz-meta-owner"],
            [String::new(), "ops".to_string()]
        );

        for name in diff.common.keys() {
            assert!(!diff.differing.contains_key(name));
        }
    }

    #[test]
    fn test_ignored_headers_are_not_significant() {
        let a = headers(&[("content-length", "1"), ("etag", "\"a\"")]);
        let b = headers(&[("content-length", "1"), ("etag", "\"b\"")]);
        let diff = HeaderDiff::compute(&a, &b);

        let ignored: IgnoredHeaders = ["ETag"].into_iter().collect();
        assert!(!diff.is_significant(&ignored));
        // Still reported for visibility
        assert!(diff.differing.contains_key("etag"));

        assert!(diff.is_significant(&IgnoredHeaders::new()));
    }

    #[test]
    fn test_ignored_headers_case_insensitive() {
        let names = vec!["Content-Type".to_string(), "X-AMZ-META-Owner".to_string()];
        let ignored: IgnoredHeaders = names.iter().collect();

        assert_eq!(ignored.len(), 2);
        assert!(ignored.contains("content-type"));
        assert!(ignored.contains("CONTENT-TYPE"));
        assert!(ignored.contains("x-amz-meta-owner"));
        assert!(!ignored.contains("etag"));
    }
}
