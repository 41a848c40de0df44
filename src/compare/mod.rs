//! Concurrent recursive comparison engine
//!
//! # Architecture
//!
//! ```text
//!                 Comparer::run(prefix1, prefix2)
//!                              │
//!                              ▼
//!   ┌──────────────────── TaskTracker ─────────────────────┐
//!   │                                                       │
//!   │  prefix task: list both sides ──► merge-join          │
//!   │     ├─ one-sided entries ─────────► ReportWriter      │
//!   │     ├─ matched sub-prefixes ──────► prefix tasks      │
//!   │     └─ matched keys ──────────────► key tasks         │
//!   │                                                       │
//!   │  key task: HEAD both sides ──► HeaderDiff ──► writer  │
//!   └───────────────────────────────────────────────────────┘
//!              │ one permit per remote call
//!              ▼
//!   AdmissionController (one per bucket, shared if equal)
//! ```
//!
//! Every suspension point races against the run's [`CancelToken`]. A task
//! that observes cancellation ends without emitting anything.

pub mod admission;
pub mod cancel;
pub mod comparer;
pub mod diff;
pub mod merge;
pub mod namespace;
pub mod tracker;

pub use admission::{AdmissionController, AdmissionPermit};
pub use cancel::{CancelToken, EXIT_INTERRUPTED};
pub use comparer::{
    CompareOptions, CompareStats, CompareSummary, CompareTarget, Comparer, StatsSnapshot,
};
pub use diff::{HeaderDiff, IgnoredHeaders};
pub use merge::{merge_join, MergeJoin, MergeStep};
pub use namespace::{Listing, Namespace};
pub use tracker::TaskTracker;
