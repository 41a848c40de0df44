//! Error types for s3-tree-compare
//!
//! This module defines the error hierarchy used across the crate:
//! - Remote object store failures (listing, metadata calls)
//! - Per-subtree comparison failures, which never abort sibling subtrees
//! - Report output errors
//! - Configuration and CLI errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors carry the `s3://` location they concern
//! - Preserve error chains for debugging

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the s3-tree-compare application
#[derive(Error, Debug)]
pub enum CompareError {
    /// Remote store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Report output errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors (opening the output file, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Installing the termination signal handler failed
    #[error("Failed to set signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

/// Remote object store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The remote call failed (transport, authentication, service error)
    #[error("{operation} on '{target}' failed: {reason}")]
    Request {
        operation: &'static str,
        target: String,
        reason: String,
    },

    /// The remote call succeeded but the response lacks a mandatory field
    #[error("{operation} on '{target}' returned no {field}")]
    MissingField {
        operation: &'static str,
        target: String,
        field: &'static str,
    },
}

impl StoreError {
    /// Build a request failure for `operation` against `target`
    pub fn request(operation: &'static str, target: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Request {
            operation,
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a single subtree or key comparison
///
/// None of these abort the run: the failing subtree contributes no further
/// reports and its siblings proceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubtreeError {
    /// Listing one prefix failed
    #[error("Failed to read from {url}: {source}")]
    ListingFailed {
        url: String,
        #[source]
        source: StoreError,
    },

    /// HeadObject on one key failed
    #[error("HeadObject on {url} failed: {source}")]
    MetadataFetchFailed {
        url: String,
        #[source]
        source: StoreError,
    },

    /// The store returned an entry outside the queried prefix
    #[error("Listing {url} returned '{entry}', which does not begin with '{prefix}'")]
    InvariantViolation {
        url: String,
        prefix: String,
        entry: String,
    },

    /// The run was cancelled while this subtree was suspended
    #[error("Comparison cancelled")]
    Cancelled,
}

impl SubtreeError {
    /// Cancellation propagates silently and is never reported
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SubtreeError::Cancelled)
    }

    /// Check if this error is a contract violation of the remote API
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, SubtreeError::InvariantViolation { .. })
    }
}

/// Report output errors
#[derive(Error, Debug)]
pub enum ReportError {
    /// Writing to the output sink failed
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a report failed
    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration and CLI errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Malformed S3 URL
    #[error("Invalid S3 URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Concurrency must be positive
    #[error("Invalid concurrency {value}: must be greater than 0")]
    InvalidConcurrency { value: usize },

    /// An endpoint override was given without a region to sign for
    #[error("Region must be specified if an endpoint is specified (side {side})")]
    EndpointWithoutRegion { side: usize },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },
}

/// Result type alias for CompareError
pub type Result<T> = std::result::Result<T, CompareError>;

/// Result type alias for StoreError
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for SubtreeError
pub type SubtreeResult<T> = std::result::Result<T, SubtreeError>;

/// Result type alias for ReportError
pub type ReportResult<T> = std::result::Result<T, ReportError>;
