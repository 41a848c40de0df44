//! In-process object store
//!
//! Mirrors the delimiter listing semantics of S3 over a sorted map. Used by the
//! test suite and benchmarks; it can inject failures, add latency to every
//! call, and records how many calls were in flight at once.

use super::types::{ListPage, ObjectMetadata};
use super::{s3_url, ObjectStore};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Default number of entries per listing page (S3 uses 1000)
const DEFAULT_PAGE_SIZE: usize = 1000;

type Location = (String, String);

/// Object store held entirely in memory
pub struct InMemoryStore {
    buckets: RwLock<BTreeMap<String, BTreeMap<String, ObjectMetadata>>>,
    page_size: usize,
    latency: Option<Duration>,
    failing_listings: RwLock<HashSet<Location>>,
    failing_heads: RwLock<HashSet<Location>>,
    stray_entries: RwLock<HashMap<Location, Vec<String>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    list_calls: AtomicU64,
    head_calls: AtomicU64,
}

/// Listing entry before pagination
enum Entry {
    CommonPrefix(String),
    Key(String),
}

/// Tracks one in-flight call
struct CallGuard<'a> {
    store: &'a InMemoryStore,
}

impl<'a> CallGuard<'a> {
    fn new(store: &'a InMemoryStore) -> Self {
        let current = store.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        store.max_in_flight.fetch_max(current, Ordering::SeqCst);
        Self { store }
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.store.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            latency: None,
            failing_listings: RwLock::new(HashSet::new()),
            failing_heads: RwLock::new(HashSet::new()),
            stray_entries: RwLock::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            list_calls: AtomicU64::new(0),
            head_calls: AtomicU64::new(0),
        }
    }

    /// Limit listing pages to `page_size` entries
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every call by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store an object
    pub fn put(&self, bucket: &str, key: &str, metadata: ObjectMetadata) {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), metadata);
    }

    /// Make every listing of exactly `prefix` fail
    pub fn fail_listing(&self, bucket: &str, prefix: &str) {
        self.failing_listings
            .write()
            .insert((bucket.to_string(), prefix.to_string()));
    }

    /// Make every HEAD of `key` fail
    pub fn fail_head(&self, bucket: &str, key: &str) {
        self.failing_heads
            .write()
            .insert((bucket.to_string(), key.to_string()));
    }

    /// Return `entry` as a key in the first page of listing `prefix`,
    /// whether or not it lies under that prefix
    pub fn inject_listing_entry(&self, bucket: &str, prefix: &str, entry: &str) {
        self.stray_entries
            .write()
            .entry((bucket.to_string(), prefix.to_string()))
            .or_default()
            .push(entry.to_string());
    }

    /// Total number of stored objects
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.read().values().map(BTreeMap::len).sum()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest number of calls observed in flight at the same time
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of list_page calls served
    #[must_use]
    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::Relaxed)
    }

    /// Number of head_object calls served
    #[must_use]
    pub fn head_calls(&self) -> u64 {
        self.head_calls.load(Ordering::Relaxed)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn collect_entries(&self, bucket: &str, prefix: &str, delimiter: &str) -> Vec<Entry> {
        let buckets = self.buckets.read();
        let mut entries = Vec::new();

        if let Some(objects) = buckets.get(bucket) {
            let under_prefix = objects
                .range(prefix.to_string()..)
                .map(|(key, _)| key)
                .take_while(|key| key.starts_with(prefix));

            for key in under_prefix {
                let rest = &key[prefix.len()..];
                let grouped = if delimiter.is_empty() { None } else { rest.find(delimiter) };

                match grouped {
                    Some(idx) => {
                        let common = format!("{}{}", prefix, &rest[..idx + delimiter.len()]);
                        // Keys sharing a common prefix are contiguous in sort order
                        let duplicate = matches!(entries.last(), Some(Entry::CommonPrefix(last)) if *last == common);
                        if !duplicate {
                            entries.push(Entry::CommonPrefix(common));
                        }
                    }
                    None => entries.push(Entry::Key(key.clone())),
                }
            }
        }

        if let Some(stray) = self
            .stray_entries
            .read()
            .get(&(bucket.to_string(), prefix.to_string()))
        {
            entries.splice(0..0, stray.iter().cloned().map(Entry::Key));
        }

        entries
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        continuation: Option<String>,
    ) -> StoreResult<ListPage> {
        let _guard = CallGuard::new(self);
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;

        if self
            .failing_listings
            .read()
            .contains(&(bucket.to_string(), prefix.to_string()))
        {
            return Err(StoreError::request(
                "ListObjectsV2",
                s3_url(bucket, prefix),
                "injected listing failure",
            ));
        }

        let start = match continuation {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                StoreError::request(
                    "ListObjectsV2",
                    s3_url(bucket, prefix),
                    format!("invalid continuation token '{}'", token),
                )
            })?,
        };

        let entries = self.collect_entries(bucket, prefix, delimiter);
        let end = (start + self.page_size).min(entries.len());
        let mut page = ListPage::default();

        for entry in entries.iter().take(end).skip(start) {
            match entry {
                Entry::CommonPrefix(p) => page.common_prefixes.push(p.clone()),
                Entry::Key(k) => page.keys.push(k.clone()),
            }
        }

        if end < entries.len() {
            page.next_continuation = Some(end.to_string());
        }

        Ok(page)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata> {
        let _guard = CallGuard::new(self);
        self.head_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;

        if self
            .failing_heads
            .read()
            .contains(&(bucket.to_string(), key.to_string()))
        {
            return Err(StoreError::request(
                "HeadObject",
                s3_url(bucket, key),
                "injected head failure",
            ));
        }

        self.buckets
            .read()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| StoreError::request("HeadObject", s3_url(bucket, key), "404 Not Found"))
    }
}
