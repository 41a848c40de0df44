//! s3-tree-compare - Compare two S3 prefix trees by metadata
//!
//! Walks two `s3://bucket/prefix` trees in lock-step and reports entries
//! present on only one side, and objects whose metadata headers differ.
//! Object bodies are never downloaded: keys are compared through delimiter
//! listings and HEAD requests only.
//!
//! # Features
//!
//! - **Concurrent Recursive Walk**: Every matched sub-prefix and key pair is
//!   compared in its own task on the tokio runtime.
//!
//! - **Bounded Load**: At most N remote calls are in flight per bucket
//!   (default 20). Two sides in the same bucket share that budget.
//!
//! - **Failure Isolation**: A failed listing or HEAD abandons only its own
//!   subtree; siblings are still compared.
//!
//! - **Text or JSON Output**: Unified-diff style text, or a streamed JSON
//!   array that stays valid even when the run is interrupted.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────┐         ┌───────────────────────┐
//! │  s3://bucket1/prefix  │         │  s3://bucket2/prefix  │
//! └───────────┬───────────┘         └───────────┬───────────┘
//!             │ ListObjectsV2 / HeadObject      │
//!             ▼                                 ▼
//! ┌───────────────────────┐         ┌───────────────────────┐
//! │ Namespace + Admission │         │ Namespace + Admission │
//! └───────────┬───────────┘         └───────────┬───────────┘
//!             └───────────────┬─────────────────┘
//!                             ▼
//!             ┌───────────────────────────────┐
//!             │           Comparer            │
//!             │  - merge-join sorted listings │
//!             │  - header diff per key pair   │
//!             │  - one task per matched pair  │
//!             └───────────────┬───────────────┘
//!                             ▼
//!             ┌───────────────────────────────┐
//!             │         ReportWriter          │
//!             │  (text or JSON, one lock)     │
//!             └───────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Compare a bucket against its replica
//! s3-tree-compare s3://primary/data/ s3://replica/data/
//!
//! # JSON output, ignoring ETag differences, against a local endpoint
//! s3-tree-compare s3://a/ s3://b/ -f json --ignore-header etag \
//!     --endpoint http://localhost:9000 --region us-east-1 -o diff.json
//! ```

pub mod compare;
pub mod config;
pub mod error;
pub mod progress;
pub mod report;
pub mod store;

pub use compare::{CancelToken, CompareOptions, CompareSummary, CompareTarget, Comparer};
pub use config::{CliArgs, CompareConfig, OutputFormat};
pub use error::{CompareError, Result};
pub use report::{DiffReport, ReportWriter};
pub use store::{InMemoryStore, ObjectMetadata, ObjectStore, S3Store};
