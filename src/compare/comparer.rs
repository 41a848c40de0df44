//! Recursive comparison of two prefix trees
//!
//! One task is spawned per matched prefix pair and one per matched key pair.
//! A prefix task lists both sides concurrently, merge-joins the sorted
//! sub-prefix and key suffixes, reports one-sided entries in name order,
//! and spawns tasks for matched entries without waiting for them. The run
//! ends when the [`TaskTracker`] drains, after which the report writer is
//! finalized.
//!
//! Sibling subtrees run concurrently, so across subtrees reports appear in
//! completion order rather than tree order.

use super::admission::AdmissionController;
use super::cancel::CancelToken;
use super::diff::{HeaderDiff, IgnoredHeaders};
use super::merge::{merge_join, MergeStep};
use super::namespace::Namespace;
use super::tracker::TaskTracker;
use crate::config::DEFAULT_CONCURRENCY;
use crate::error::{ReportError, ReportResult, SubtreeError, SubtreeResult};
use crate::report::{DiffObject, DiffReport, MissingEntry, ReportWriter, Side};
use crate::store::{s3_url, ObjectStore};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// One side of a comparison
#[derive(Clone)]
pub struct CompareTarget {
    pub store: Arc<dyn ObjectStore>,
    pub bucket: String,
}

impl CompareTarget {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }
}

/// Tuning and filtering for a comparison run
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Maximum concurrent remote calls per bucket
    pub concurrency: usize,

    /// Headers that never trigger a mismatch report
    pub ignored_headers: IgnoredHeaders,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            ignored_headers: IgnoredHeaders::new(),
        }
    }
}

/// Counters updated while a comparison runs
#[derive(Debug, Default)]
pub struct CompareStats {
    prefixes_compared: AtomicU64,
    keys_compared: AtomicU64,
    bytes_compared: AtomicU64,
    missing: AtomicU64,
    mismatched: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`CompareStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub prefixes_compared: u64,
    pub keys_compared: u64,
    pub bytes_compared: u64,
    pub missing: u64,
    pub mismatched: u64,
    pub errors: u64,
}

impl CompareStats {
    pub fn record_prefix(&self) {
        self.prefixes_compared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_key(&self, bytes: u64) {
        self.keys_compared.fetch_add(1, Ordering::Relaxed);
        self.bytes_compared.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_missing(&self) {
        self.missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mismatch(&self) {
        self.mismatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            prefixes_compared: self.prefixes_compared.load(Ordering::Relaxed),
            keys_compared: self.keys_compared.load(Ordering::Relaxed),
            bytes_compared: self.bytes_compared.load(Ordering::Relaxed),
            missing: self.missing.load(Ordering::Relaxed),
            mismatched: self.mismatched.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Result of a comparison run
#[derive(Debug, Clone)]
pub struct CompareSummary {
    pub stats: StatsSnapshot,

    /// Wall-clock duration
    pub duration: Duration,

    /// False if the run was cancelled before the trees were drained
    pub completed: bool,
}

impl CompareSummary {
    /// Check if any subtree failed or output could not be written
    pub fn has_failures(&self) -> bool {
        self.stats.errors > 0
    }

    /// Check if any missing or mismatch report was emitted
    pub fn has_differences(&self) -> bool {
        self.stats.missing > 0 || self.stats.mismatched > 0
    }
}

/// State shared by every task of one run
struct RunState {
    first: Namespace,
    second: Namespace,
    ignored_headers: IgnoredHeaders,
    writer: Arc<ReportWriter>,
    tracker: Arc<TaskTracker>,
    cancel: CancelToken,
    stats: Arc<CompareStats>,
    output_failed: AtomicBool,
}

type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Compares two prefix trees and writes the differences
pub struct Comparer {
    state: Arc<RunState>,
}

impl Comparer {
    /// Create a comparer
    ///
    /// Both sides share one admission controller when they use the same
    /// bucket, so that bucket sees at most `options.concurrency` calls.
    pub fn new(
        first: CompareTarget,
        second: CompareTarget,
        options: CompareOptions,
        writer: Arc<ReportWriter>,
        cancel: CancelToken,
    ) -> Self {
        let (admission1, admission2) =
            AdmissionController::for_pair(&first.bucket, &second.bucket, options.concurrency);

        Self {
            state: Arc::new(RunState {
                first: Namespace::new(first.store, first.bucket, admission1),
                second: Namespace::new(second.store, second.bucket, admission2),
                ignored_headers: options.ignored_headers,
                writer,
                tracker: TaskTracker::new(),
                cancel,
                stats: Arc::new(CompareStats::default()),
                output_failed: AtomicBool::new(false),
            }),
        }
    }

    /// Get the live counters of this run
    pub fn stats(&self) -> Arc<CompareStats> {
        Arc::clone(&self.state.stats)
    }

    /// Get the cancellation token of this run
    pub fn cancel_token(&self) -> CancelToken {
        self.state.cancel.clone()
    }

    /// Compare `prefix1` on the first side with `prefix2` on the second
    ///
    /// Returns once every spawned task has finished and the writer has been
    /// finalized. Subtree failures are logged and counted in the summary;
    /// only a failure to finalize the output is returned as an error.
    pub async fn run(self, prefix1: &str, prefix2: &str) -> ReportResult<CompareSummary> {
        let start = Instant::now();
        let state = self.state;

        info!(
            first = %s3_url(state.first.bucket(), prefix1),
            second = %s3_url(state.second.bucket(), prefix2),
            "Starting comparison"
        );

        spawn_prefix(&state, prefix1.to_string(), prefix2.to_string());
        state.tracker.wait().await;

        let completed = !state.cancel.is_cancelled();
        let finished = state.writer.finish();

        let summary = CompareSummary {
            stats: state.stats.snapshot(),
            duration: start.elapsed(),
            completed,
        };

        info!(
            prefixes = summary.stats.prefixes_compared,
            keys = summary.stats.keys_compared,
            missing = summary.stats.missing,
            mismatched = summary.stats.mismatched,
            errors = summary.stats.errors,
            completed,
            "Comparison finished"
        );

        finished.map(|()| summary)
    }
}

fn spawn_prefix(state: &Arc<RunState>, prefix1: String, prefix2: String) {
    let task_state = Arc::clone(state);
    let task: BoxedTask = Box::pin(async move {
        if let Err(err) = task_state.compare_prefixes(&prefix1, &prefix2).await {
            task_state.record_failure(err);
        }
    });
    state.tracker.spawn(task);
}

fn spawn_keys(state: &Arc<RunState>, key1: String, key2: String) {
    let task_state = Arc::clone(state);
    let task: BoxedTask = Box::pin(async move {
        if let Err(err) = task_state.compare_keys(&key1, &key2).await {
            task_state.record_failure(err);
        }
    });
    state.tracker.spawn(task);
}

impl RunState {
    async fn compare_prefixes(self: &Arc<Self>, prefix1: &str, prefix2: &str) -> SubtreeResult<()> {
        let (listing1, listing2) = tokio::try_join!(
            self.first.list(prefix1, &self.cancel),
            self.second.list(prefix2, &self.cancel),
        )?;

        if self.cancel.is_cancelled() {
            return Err(SubtreeError::Cancelled);
        }
        self.stats.record_prefix();

        let mut matched_prefixes = Vec::new();
        for step in merge_join(&listing1.subprefixes, &listing2.subprefixes) {
            match step {
                MergeStep::Both(sub) => matched_prefixes.push(sub),
                MergeStep::OnlyFirst(sub) => self.report_missing(prefix1, sub, Side::First),
                MergeStep::OnlySecond(sub) => self.report_missing(prefix2, sub, Side::Second),
            }
        }

        let mut matched_keys = Vec::new();
        for step in merge_join(&listing1.keys, &listing2.keys) {
            match step {
                MergeStep::Both(key) => matched_keys.push(key),
                MergeStep::OnlyFirst(key) => self.report_missing(prefix1, key, Side::First),
                MergeStep::OnlySecond(key) => self.report_missing(prefix2, key, Side::Second),
            }
        }

        debug!(
            prefix1,
            prefix2,
            subprefixes = matched_prefixes.len(),
            keys = matched_keys.len(),
            "Merged listings"
        );

        for sub in matched_prefixes {
            spawn_prefix(self, format!("{}{}", prefix1, sub), format!("{}{}", prefix2, sub));
        }
        for key in matched_keys {
            spawn_keys(self, format!("{}{}", prefix1, key), format!("{}{}", prefix2, key));
        }

        Ok(())
    }

    async fn compare_keys(&self, key1: &str, key2: &str) -> SubtreeResult<()> {
        let (meta1, meta2) = tokio::try_join!(
            self.first.head(key1, &self.cancel),
            self.second.head(key2, &self.cancel),
        )?;

        if self.cancel.is_cancelled() {
            return Err(SubtreeError::Cancelled);
        }
        self.stats.record_key(meta1.content_length);

        let diff = HeaderDiff::compute(&meta1.headers(), &meta2.headers());
        if !diff.is_significant(&self.ignored_headers) {
            trace!(key1, key2, "Metadata matches");
            return Ok(());
        }

        let report = DiffReport::mismatch(
            DiffObject::new(self.first.url(key1), meta1.last_modified_display()),
            DiffObject::new(self.second.url(key2), meta2.last_modified_display()),
            diff,
        );

        match self.writer.write_mismatch(&report) {
            Ok(()) => self.stats.record_mismatch(),
            Err(err) => self.output_error(err),
        }
        Ok(())
    }

    fn report_missing(&self, prefix: &str, suffix: &str, side: Side) {
        let bucket = match side {
            Side::First => self.first.bucket(),
            Side::Second => self.second.bucket(),
        };
        let entry = MissingEntry::new(bucket, prefix, suffix, side);

        match self.writer.write_missing(&entry) {
            Ok(()) => self.stats.record_missing(),
            Err(err) => self.output_error(err),
        }
    }

    fn record_failure(&self, err: SubtreeError) {
        match err {
            SubtreeError::Cancelled => {}
            SubtreeError::InvariantViolation { .. } => {
                error!(error = %err, "Store returned an entry outside the listed prefix");
                self.stats.record_error();
            }
            _ => {
                warn!("{}", err);
                self.stats.record_error();
            }
        }
    }

    /// A report that cannot be written makes the rest of the output useless
    fn output_error(&self, err: ReportError) {
        self.stats.record_error();
        if !self.output_failed.swap(true, Ordering::SeqCst) {
            error!(error = %err, "Cannot write report output, cancelling comparison");
        }
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::error::StoreResult;
    use crate::store::{InMemoryStore, ListPage, ObjectMetadata};
    use async_trait::async_trait;
    use std::io;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Store that cancels the run as a HEAD on `bucket` completes
    struct CancelOnHead {
        inner: InMemoryStore,
        bucket: &'static str,
        cancel: CancelToken,
    }

    #[async_trait]
    impl ObjectStore for CancelOnHead {
        async fn list_page(
            &self,
            bucket: &str,
            prefix: &str,
            delimiter: &str,
            continuation: Option<String>,
        ) -> StoreResult<ListPage> {
            self.inner.list_page(bucket, prefix, delimiter, continuation).await
        }

        async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata> {
            let meta = self.inner.head_object(bucket, key).await;
            if bucket == self.bucket {
                self.cancel.cancel();
            }
            meta
        }
    }

    fn run_text(store: Arc<InMemoryStore>, prefix1: &str, prefix2: &str) -> (String, CompareSummary) {
        run_text_with(store, CancelToken::new(), prefix1, prefix2)
    }

    fn run_text_with(
        store: Arc<dyn ObjectStore>,
        cancel: CancelToken,
        prefix1: &str,
        prefix2: &str,
    ) -> (String, CompareSummary) {
        let buf = SharedBuf::default();
        let writer = Arc::new(ReportWriter::new(Box::new(buf.clone()), OutputFormat::Text));
        let comparer = Comparer::new(
            CompareTarget::new(store.clone(), "left"),
            CompareTarget::new(store, "right"),
            CompareOptions::default(),
            writer,
            cancel,
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let summary = runtime.block_on(comparer.run(prefix1, prefix2)).unwrap();
        let text = String::from_utf8(buf.0.lock().clone()).unwrap();
        (text, summary)
    }

    #[test]
    fn test_missing_keys_in_name_order() {
        let store = InMemoryStore::new();
        for key in ["a", "b", "d"] {
            store.put("left", key, ObjectMetadata::new(1));
        }
        for key in ["b", "c", "e"] {
            store.put("right", key, ObjectMetadata::new(1));
        }

        let (text, summary) = run_text(Arc::new(store), "", "");
        assert_eq!(
            text,
            "Only in s3://left/: a\nOnly in s3://right/: c\nOnly in s3://left/: d\nOnly in s3://right/: e\n"
        );
        assert!(summary.completed);
        assert_eq!(summary.stats.missing, 4);
        assert_eq!(summary.stats.keys_compared, 1);
        assert!(!summary.has_failures());
    }

    #[test]
    fn test_different_root_prefixes() {
        let store = InMemoryStore::new();
        store.put("left", "v1/data/x", ObjectMetadata::new(5).with_content_type("a"));
        store.put("right", "backup/v1/data/x", ObjectMetadata::new(5).with_content_type("b"));

        let (text, summary) = run_text(Arc::new(store), "v1/", "backup/v1/");
        assert!(text.starts_with("--- s3://left/v1/data/x"));
        assert!(text.contains("+++ s3://right/backup/v1/data/x"));
        assert_eq!(summary.stats.mismatched, 1);
        assert_eq!(summary.stats.prefixes_compared, 2);
        assert_eq!(summary.stats.bytes_compared, 5);
    }

    #[test]
    fn test_listing_failure_is_counted() {
        let store = InMemoryStore::new();
        store.put("left", "ok/a", ObjectMetadata::new(1));
        store.put("right", "ok/a", ObjectMetadata::new(1));
        store.put("left", "bad/a", ObjectMetadata::new(1));
        store.put("right", "bad/a", ObjectMetadata::new(1));
        store.fail_listing("right", "bad/");

        let (text, summary) = run_text(Arc::new(store), "", "");
        assert!(text.is_empty());
        assert!(summary.completed);
        assert!(summary.has_failures());
        assert_eq!(summary.stats.errors, 1);
        assert_eq!(summary.stats.keys_compared, 1);
    }

    #[test]
    fn test_cancel_during_head_emits_no_mismatch() {
        let inner = InMemoryStore::new();
        inner.put("left", "k", ObjectMetadata::new(1).with_content_type("text/plain"));
        inner.put("right", "k", ObjectMetadata::new(1).with_content_type("text/html"));

        let cancel = CancelToken::new();
        let store = Arc::new(CancelOnHead {
            inner,
            bucket: "right",
            cancel: cancel.clone(),
        });

        let (text, summary) = run_text_with(store, cancel, "", "");
        assert!(text.is_empty());
        assert!(!summary.completed);
        assert_eq!(summary.stats.mismatched, 0);
        assert_eq!(summary.stats.keys_compared, 0);
        assert!(!summary.has_failures());
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = CompareStats::default();
        stats.record_prefix();
        stats.record_key(100);
        stats.record_key(20);
        stats.record_missing();
        stats.record_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.prefixes_compared, 1);
        assert_eq!(snapshot.keys_compared, 2);
        assert_eq!(snapshot.bytes_compared, 120);
        assert_eq!(snapshot.missing, 1);
        assert_eq!(snapshot.mismatched, 0);
        assert_eq!(snapshot.errors, 1);
    }
}
