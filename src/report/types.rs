//! Report data types and their renderings

use crate::compare::HeaderDiff;
use crate::store::s3_url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Kind of finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiffType {
    Missing,
    Mismatch,
}

/// Which side of the comparison an entry was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    First,
    Second,
}

/// One side of a finding
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffObject {
    /// Full `s3://` URL, empty when absent on this side
    #[serde(rename = "Url")]
    pub url: String,

    #[serde(
        rename = "LastModified",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<String>,
}

impl DiffObject {
    pub fn new(url: impl Into<String>, last_modified: Option<String>) -> Self {
        Self {
            url: url.into(),
            last_modified,
        }
    }

    /// Object denoting absence on one side
    pub fn absent() -> Self {
        Self::default()
    }
}

/// A single emitted finding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffReport {
    #[serde(rename = "Type")]
    pub kind: DiffType,

    #[serde(rename = "DiffObjects")]
    pub objects: [DiffObject; 2],

    #[serde(
        rename = "CommonHeaders",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub common_headers: BTreeMap<String, String>,

    #[serde(
        rename = "DiffHeaders",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub diff_headers: BTreeMap<String, [String; 2]>,
}

impl DiffReport {
    /// Build a mismatch report from a header diff
    pub fn mismatch(first: DiffObject, second: DiffObject, diff: HeaderDiff) -> Self {
        Self {
            kind: DiffType::Mismatch,
            objects: [first, second],
            common_headers: diff.common,
            diff_headers: diff.differing,
        }
    }

    /// Render as a unified-diff style block
    ///
    /// ```text
    /// --- s3://a/key  2024-01-01T00:00:00Z
    /// +++ s3://bb/key 2024-01-02T00:00:00Z
    /// @@ -1,2 +1,2 @@
    ///  content-length: 10
    /// -content-type: text/plain
    /// +content-type: text/html
    /// ```
    pub fn to_text(&self) -> String {
        let [first, second] = &self.objects;
        let width = first.url.len().max(second.url.len());

        let mut names: Vec<&String> = self
            .common_headers
            .keys()
            .chain(self.diff_headers.keys())
            .collect();
        names.sort();

        let mut body = String::new();
        let (mut lines1, mut lines2) = (0usize, 0usize);

        for name in names {
            if let Some(value) = self.common_headers.get(name) {
                let _ = writeln!(body, " {}: {}", name, value);
                lines1 += 1;
                lines2 += 1;
            } else if let Some([value1, value2]) = self.diff_headers.get(name) {
                if !value1.is_empty() {
                    let _ = writeln!(body, "-{}: {}", name, value1);
                    lines1 += 1;
                }
                if !value2.is_empty() {
                    let _ = writeln!(body, "+{}: {}", name, value2);
                    lines2 += 1;
                }
            }
        }

        let mut out = String::with_capacity(body.len() + 2 * width + 64);
        push_file_line(&mut out, "---", first, width);
        push_file_line(&mut out, "+++", second, width);
        let _ = writeln!(out, "@@ -1,{} +1,{} @@", lines1, lines2);
        out.push_str(&body);
        out
    }
}

fn push_file_line(out: &mut String, marker: &str, object: &DiffObject, width: usize) {
    let line = format!(
        "{} {:<width$} {}",
        marker,
        object.url,
        object.last_modified.as_deref().unwrap_or(""),
        width = width
    );
    out.push_str(line.trim_end());
    out.push('\n');
}

/// An entry present under a prefix on one side only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEntry {
    /// Bucket the entry was found in
    pub bucket: String,
    /// Prefix being compared on that side
    pub prefix: String,
    /// Name relative to `prefix`
    pub suffix: String,
    /// Side the entry was found on
    pub side: Side,
}

impl MissingEntry {
    pub fn new(bucket: &str, prefix: &str, suffix: &str, side: Side) -> Self {
        Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            side,
        }
    }

    /// Full URL of the entry on the side it was found on
    pub fn url(&self) -> String {
        s3_url(&self.bucket, &format!("{}{}", self.prefix, self.suffix))
    }

    /// Render as `Only in s3://bucket/prefix: suffix`
    pub fn to_text(&self) -> String {
        format!(
            "Only in {}: {}\n",
            s3_url(&self.bucket, &self.prefix),
            self.suffix
        )
    }

    /// Render as a `Missing` report
    pub fn to_report(&self) -> DiffReport {
        let present = DiffObject::new(self.url(), None);
        let objects = match self.side {
            Side::First => [present, DiffObject::absent()],
            Side::Second => [DiffObject::absent(), present],
        };

        DiffReport {
            kind: DiffType::Missing,
            objects,
            common_headers: BTreeMap::new(),
            diff_headers: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mismatch() -> DiffReport {
        let mut diff = HeaderDiff::default();
        diff.common.insert("content-length".into(), "10".into());
        diff.differing.insert(
            "content-type".into(),
            ["text/plain".into(), "text/html".into()],
        );
        diff.differing
            .insert("x-amz-meta-owner".into(), [String::new(), "ops".into()]);

        DiffReport::mismatch(
            DiffObject::new("s3://a/key", Some("2024-01-01T00:00:00Z".into())),
            DiffObject::new("s3://bb/key", Some("2024-01-02T00:00:00Z".into())),
            diff,
        )
    }

    #[test]
    fn test_missing_text() {
        let entry = MissingEntry::new("bucket", "data/", "dir/", Side::First);
        assert_eq!(entry.to_text(), "Only in s3://bucket/data/: dir/\n");
        assert_eq!(entry.url(), "s3://bucket/data/dir/");
    }

    #[test]
    fn test_missing_json() {
        let entry = MissingEntry::new("b2", "", "c", Side::Second);
        let json = serde_json::to_string(&entry.to_report()).unwrap();
        assert_eq!(
            json,
            r#"{"Type":"Missing","DiffObjects":[{"Url":""},{"Url":"s3://b2/c"}]}"#
        );
    }

    #[test]
    fn test_mismatch_json() {
        let json = serde_json::to_string(&sample_mismatch()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"Type":"Mismatch","DiffObjects":["#,
                r#"{"Url":"s3://a/key","LastModified":"2024-01-01T00:00:00Z"},"#,
                r#"{"Url":"s3://bb/key","LastModified":"2024-01-02T00:00:00Z"}],"#,
                r#""CommonHeaders":{"content-length":"10"},"#,
                r#""DiffHeaders":{"content-type":["text/plain","text/html"],"x-amz-meta-owner":["","ops"]}}"#
            )
        );

        let parsed: DiffReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample_mismatch());
    }

    #[test]
    fn test_mismatch_text() {
        let text = sample_mismatch().to_text();
        assert_eq!(
            text,
            concat!(
                "--- s3://a/key  2024-01-01T00:00:00Z\n",
                "+++ s3://bb/key 2024-01-02T00:00:00Z\n",
                "@@ -1,2 +1,3 @@\n",
                " content-length: 10\n",
                "-content-type: text/plain\n",
                "+content-type: text/html\n",
                "+x-amz-meta-owner: ops\n",
            )
        );
    }

    #[test]
    fn test_mismatch_text_without_timestamps() {
        let report = DiffReport::mismatch(
            DiffObject::new("s3://a/k", None),
            DiffObject::new("s3://a/k", None),
            HeaderDiff::default(),
        );
        assert_eq!(report.to_text(), "--- s3://a/k\n+++ s3://a/k\n@@ -1,0 +1,0 @@\n");
    }
}
