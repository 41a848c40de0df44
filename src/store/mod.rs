//! Remote object store access
//!
//! The comparison engine only needs two calls from a store: one page of a
//! delimiter listing, and a metadata-only HEAD of a single key. Both are
//! behind the [`ObjectStore`] trait so the engine can run against S3 or an
//! in-process store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   compare::Namespace                 │
//! │  - One permit per remote call                       │
//! │  - Strips prefixes, sorts, checks the contract      │
//! └──────────────────────────┬──────────────────────────┘
//!                            │ list_page / head_object
//!                            ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                  dyn ObjectStore                     │
//! │  S3Store (aws-sdk-s3)  |  InMemoryStore (tests)      │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod memory;
pub mod s3;
pub mod types;

pub use memory::InMemoryStore;
pub use s3::S3Store;
pub use types::{ListPage, ObjectMetadata};

use crate::error::StoreResult;
use async_trait::async_trait;

/// Delimiter used for hierarchical listings
pub const DELIMITER: &str = "/";

/// Minimal remote object store surface used by the comparer
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of a delimiter listing under `prefix`.
    ///
    /// `continuation` is `None` for the first page and the previous page's
    /// `next_continuation` afterwards. Returned names are full keys and full
    /// common prefixes, not suffixes.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        continuation: Option<String>,
    ) -> StoreResult<ListPage>;

    /// Fetch the metadata of a single object without its body
    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata>;
}

/// Render an `s3://bucket/key` location
pub fn s3_url(bucket: &str, key: &str) -> String {
    format!("s3://{}/{}", bucket, key)
}
