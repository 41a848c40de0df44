//! One side of a comparison: a bucket behind an admission controller
//!
//! Implements the two remote operations the comparer needs. Every remote
//! call holds exactly one permit for its duration and races against the
//! run's cancellation.

use super::admission::AdmissionController;
use super::cancel::CancelToken;
use crate::error::{SubtreeError, SubtreeResult};
use crate::store::{s3_url, ObjectMetadata, ObjectStore, DELIMITER};
use std::sync::Arc;
use tracing::trace;

/// Immediate children of one prefix, as suffixes sorted byte-wise
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Sub-prefix suffixes, each ending in the delimiter
    pub subprefixes: Vec<String>,
    /// Key suffixes
    pub keys: Vec<String>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.subprefixes.is_empty() && self.keys.is_empty()
    }
}

/// A bucket on one side of the comparison
#[derive(Clone)]
pub struct Namespace {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    admission: Arc<AdmissionController>,
}

impl Namespace {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        admission: Arc<AdmissionController>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            admission,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Render the `s3://` URL of `key` in this bucket
    pub fn url(&self, key: &str) -> String {
        s3_url(&self.bucket, key)
    }

    /// List the immediate sub-prefixes and keys under `prefix`
    ///
    /// All pages are fetched, one permit per page. Fails with
    /// `InvariantViolation` if the store returns an entry that does not begin
    /// with `prefix`.
    pub async fn list(&self, prefix: &str, cancel: &CancelToken) -> SubtreeResult<Listing> {
        let mut listing = Listing::default();
        let mut continuation: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(SubtreeError::Cancelled);
            }

            let page = {
                let _permit = self.admission.acquire(cancel).await?;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(SubtreeError::Cancelled),
                    page = self.store.list_page(&self.bucket, prefix, DELIMITER, continuation.take()) => page,
                }
            }
            .map_err(|source| SubtreeError::ListingFailed {
                url: self.url(prefix),
                source,
            })?;
            pages += 1;

            for common_prefix in &page.common_prefixes {
                let suffix = self.suffix_of(prefix, common_prefix)?;
                if suffix.is_empty() {
                    return Err(self.violation(prefix, common_prefix));
                }
                listing.subprefixes.push(suffix.to_string());
            }
            for key in &page.keys {
                // An object named exactly `prefix` has the empty suffix
                listing.keys.push(self.suffix_of(prefix, key)?.to_string());
            }

            match page.next_continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        listing.subprefixes.sort_unstable();
        listing.keys.sort_unstable();

        trace!(
            url = %self.url(prefix),
            pages,
            subprefixes = listing.subprefixes.len(),
            keys = listing.keys.len(),
            "Listed prefix"
        );

        Ok(listing)
    }

    /// Fetch the metadata of `key`
    pub async fn head(&self, key: &str, cancel: &CancelToken) -> SubtreeResult<ObjectMetadata> {
        let _permit = self.admission.acquire(cancel).await?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SubtreeError::Cancelled),
            result = self.store.head_object(&self.bucket, key) => result,
        };

        result.map_err(|source| SubtreeError::MetadataFetchFailed {
            url: self.url(key),
            source,
        })
    }

    /// Strip `prefix` from a listed entry
    fn suffix_of<'a>(&self, prefix: &str, entry: &'a str) -> SubtreeResult<&'a str> {
        entry
            .strip_prefix(prefix)
            .ok_or_else(|| self.violation(prefix, entry))
    }

    fn violation(&self, prefix: &str, entry: &str) -> SubtreeError {
        SubtreeError::InvariantViolation {
            url: self.url(prefix),
            prefix: prefix.to_string(),
            entry: entry.to_string(),
        }
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("bucket", &self.bucket)
            .field("admission", &self.admission)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn namespace(store: Arc<InMemoryStore>, capacity: usize) -> Namespace {
        Namespace::new(store, "bucket", Arc::new(AdmissionController::new(capacity)))
    }

    fn populated(page_size: usize) -> Arc<InMemoryStore> {
        let store = InMemoryStore::new().with_page_size(page_size);
        for key in [
            "root/zeta",
            "root/Alpha",
            "root/b/1",
            "root/a/2",
            "root/dir-old",
            "root/dir/x",
            "root/",
        ] {
            store.put("bucket", key, ObjectMetadata::new(1));
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_list_returns_sorted_suffixes() {
        let ns = namespace(populated(1000), 4);
        let listing = ns.list("root/", &CancelToken::new()).await.unwrap();

        assert_eq!(listing.subprefixes, vec!["a/", "b/", "dir/"]);
        // The "root/" marker object lists as the empty suffix
        assert_eq!(listing.keys, vec!["", "Alpha", "dir-old", "zeta"]);
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let store = populated(2);
        let ns = namespace(Arc::clone(&store), 4);
        let listing = ns.list("root/", &CancelToken::new()).await.unwrap();

        assert_eq!(listing.subprefixes.len(), 3);
        assert_eq!(listing.keys.len(), 4);
        assert!(store.list_calls() >= 3);
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let ns = namespace(populated(1000), 4);
        let listing = ns.list("nothing/", &CancelToken::new()).await.unwrap();
        assert!(listing.is_empty());
    }

    #[tokio::test]
    async fn test_list_failure() {
        let store = populated(1000);
        store.fail_listing("bucket", "root/");
        let ns = namespace(store, 4);

        let err = ns.list("root/", &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, SubtreeError::ListingFailed { ref url, .. } if url == "s3://bucket/root/"));
    }

    #[tokio::test]
    async fn test_list_entry_outside_prefix() {
        let store = populated(1000);
        store.inject_listing_entry("bucket", "root/", "elsewhere/key");
        let ns = namespace(store, 4);

        let err = ns.list("root/", &CancelToken::new()).await.unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[tokio::test]
    async fn test_list_rooted_at_object_key() {
        let ns = namespace(populated(1000), 4);
        let listing = ns.list("root/zeta", &CancelToken::new()).await.unwrap();

        assert!(listing.subprefixes.is_empty());
        assert_eq!(listing.keys, vec![""]);
    }

    #[tokio::test]
    async fn test_list_cancelled() {
        let ns = namespace(populated(1000), 4);
        let cancel = CancelToken::new();
        cancel.cancel();

        assert_eq!(ns.list("root/", &cancel).await, Err(SubtreeError::Cancelled));
        assert_eq!(ns.head("root/zeta", &cancel).await, Err(SubtreeError::Cancelled));
    }

    #[tokio::test]
    async fn test_head() {
        let store = populated(1000);
        store.fail_head("bucket", "root/zeta");
        let ns = namespace(store, 1);
        let cancel = CancelToken::new();

        let meta = ns.head("root/Alpha", &cancel).await.unwrap();
        assert_eq!(meta.content_length, 1);

        let err = ns.head("root/zeta", &cancel).await.unwrap_err();
        assert!(matches!(err, SubtreeError::MetadataFetchFailed { ref url, .. } if url == "s3://bucket/root/zeta"));
    }
}
