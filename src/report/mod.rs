//! Comparison findings and their output
//!
//! Two output formats are supported:
//!
//! - **Text**: `Only in s3://bucket/prefix: name` lines for missing entries
//!   and unified-diff style blocks for metadata mismatches.
//! - **JSON**: one top-level array of [`DiffReport`] objects, streamed as
//!   reports are found.
//!
//! Reports of sibling entries under one prefix are written in name order.
//! Across subtrees, reports appear in completion order.

pub mod types;
pub mod writer;

pub use types::{DiffObject, DiffReport, DiffType, MissingEntry, Side};
pub use writer::ReportWriter;
