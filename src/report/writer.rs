//! Thread-safe incremental report writer
//!
//! Reports are rendered by the calling task and written to the sink under a
//! single lock with one `write_all`, so concurrent writers never interleave
//! partial reports. In JSON mode the writer streams one top-level array; the
//! lock also guards whether its first element has been written.

use super::types::{DiffReport, MissingEntry};
use crate::config::OutputFormat;
use crate::error::ReportResult;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Mutable writer state, guarded by one lock
struct SinkState {
    sink: Box<dyn Write + Send>,
    first_written: bool,
    finished: bool,
}

/// Serializes reports to a single output sink
pub struct ReportWriter {
    format: OutputFormat,
    state: Mutex<SinkState>,
    missing: AtomicU64,
    mismatched: AtomicU64,
}

impl ReportWriter {
    pub fn new(sink: Box<dyn Write + Send>, format: OutputFormat) -> Self {
        Self {
            format,
            state: Mutex::new(SinkState {
                sink,
                first_written: false,
                finished: false,
            }),
            missing: AtomicU64::new(0),
            mismatched: AtomicU64::new(0),
        }
    }

    /// Write a missing-entry finding
    pub fn write_missing(&self, entry: &MissingEntry) -> ReportResult<()> {
        match self.format {
            OutputFormat::Text => self.write_raw(entry.to_text().as_bytes())?,
            OutputFormat::Json => self.write_json(&entry.to_report())?,
        }
        self.missing.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Write a metadata mismatch finding
    pub fn write_mismatch(&self, report: &DiffReport) -> ReportResult<()> {
        match self.format {
            OutputFormat::Text => self.write_raw(report.to_text().as_bytes())?,
            OutputFormat::Json => self.write_json(report)?,
        }
        self.mismatched.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Close the output and flush it
    ///
    /// In JSON mode this closes the array, writing `[]` if no report was
    /// emitted. Calling it again has no effect.
    pub fn finish(&self) -> ReportResult<()> {
        let mut state = self.state.lock();
        if state.finished {
            return Ok(());
        }
        state.finished = true;

        if self.format == OutputFormat::Json {
            let close: &[u8] = if state.first_written { b"\n]\n" } else { b"[]\n" };
            state.sink.write_all(close)?;
        }
        state.sink.flush()?;
        Ok(())
    }

    /// Number of missing-entry reports written
    pub fn missing_written(&self) -> u64 {
        self.missing.load(Ordering::Relaxed)
    }

    /// Number of mismatch reports written
    pub fn mismatches_written(&self) -> u64 {
        self.mismatched.load(Ordering::Relaxed)
    }

    fn write_raw(&self, data: &[u8]) -> ReportResult<()> {
        let mut state = self.state.lock();
        state.sink.write_all(data)?;
        Ok(())
    }

    fn write_json(&self, report: &DiffReport) -> ReportResult<()> {
        let payload = serde_json::to_vec(report)?;
        let mut buf = Vec::with_capacity(payload.len() + 2);

        let mut state = self.state.lock();
        buf.extend_from_slice(if state.first_written { b",\n" } else { b"[\n" });
        buf.extend_from_slice(&payload);
        // A failed write may still have emitted the opening bracket
        state.first_written = true;
        state.sink.write_all(&buf)?;
        Ok(())
    }
}

impl std::fmt::Debug for ReportWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportWriter")
            .field("format", &self.format)
            .field("missing", &self.missing_written())
            .field("mismatched", &self.mismatches_written())
            .finish_non_exhaustive()
    }
}
