//! Progress reporting for comparison runs
//!
//! Everything here draws on stderr; stdout may be carrying the report stream.

use crate::compare::{CompareSummary, StatsSnapshot};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Spinner showing live comparison counters
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, stats: &StatsSnapshot, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 {
            stats.keys_compared as f64 / secs
        } else {
            0.0
        };

        let msg = format!(
            "Prefixes: {} | Keys: {} | Size: {} | Rate: {:.0}/s | Missing: {} | Mismatched: {} | Errors: {}",
            format_number(stats.prefixes_compared),
            format_number(stats.keys_compared),
            format_size(stats.bytes_compared, BINARY),
            rate,
            format_number(stats.missing),
            format_number(stats.mismatched),
            format_number(stats.errors),
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the comparison
pub fn print_header(first: &str, second: &str, concurrency: usize, output: &str) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("s3-tree-compare").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("First:").bold(), first);
    eprintln!("  {} {}", style("Second:").bold(), second);
    eprintln!("  {} {}", style("Concurrency:").bold(), concurrency);
    eprintln!("  {} {}", style("Output:").bold(), output);
    eprintln!();
}

/// Print a summary of the comparison
pub fn print_summary(summary: &CompareSummary) {
    let stats = &summary.stats;
    let secs = summary.duration.as_secs_f64();
    let rate = if secs > 0.0 {
        stats.keys_compared as f64 / secs
    } else {
        0.0
    };

    let title = if summary.completed {
        style("Comparison Complete").green().bold()
    } else {
        style("Comparison Interrupted").yellow().bold()
    };

    eprintln!();
    eprintln!("{}", title);
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!(
        "  {} {}",
        style("Prefixes:").bold(),
        format_number(stats.prefixes_compared)
    );
    eprintln!(
        "  {} {}",
        style("Keys:").bold(),
        format_number(stats.keys_compared)
    );
    eprintln!(
        "  {} {}",
        style("Size:").bold(),
        format_size(stats.bytes_compared, BINARY)
    );
    eprintln!(
        "  {} {:.1}s ({:.0} keys/sec)",
        style("Duration:").bold(),
        secs,
        rate
    );
    eprintln!("  {} {}", style("Missing:").bold(), format_number(stats.missing));
    eprintln!(
        "  {} {}",
        style("Mismatched:").bold(),
        format_number(stats.mismatched)
    );
    if stats.errors > 0 {
        eprintln!(
            "  {} {}",
            style("Errors:").yellow().bold(),
            format_number(stats.errors)
        );
    }
    eprintln!();
}
