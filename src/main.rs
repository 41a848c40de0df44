//! s3-tree-compare - Compare two S3 prefix trees by metadata
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use s3_tree_compare::compare::{
    CancelToken, CompareOptions, CompareTarget, Comparer, EXIT_INTERRUPTED,
};
use s3_tree_compare::config::{CliArgs, CompareConfig, OutputTarget};
use s3_tree_compare::progress::{print_header, print_summary, ProgressReporter};
use s3_tree_compare::report::ReportWriter;
use s3_tree_compare::store::S3Store;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = CompareConfig::from_args(args).context("Invalid configuration")?;

    if config.show_progress {
        print_header(
            &config.first.to_string(),
            &config.second.to_string(),
            config.concurrency,
            &config.output.to_string(),
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    runtime.block_on(run_compare(config))
}

async fn run_compare(config: CompareConfig) -> Result<ExitCode> {
    let sink = open_output(&config.output)
        .with_context(|| format!("Unable to open {} for writing", config.output))?;
    let writer = Arc::new(ReportWriter::new(sink, config.format));

    let first_store = S3Store::connect(&config.first_client).await;
    let second_store = S3Store::connect(&config.second_client).await;

    let cancel = CancelToken::new();
    let interrupted = cancel.cancel_on_signal()?;

    let comparer = Comparer::new(
        CompareTarget::new(Arc::new(first_store), config.first.bucket.clone()),
        CompareTarget::new(Arc::new(second_store), config.second.bucket.clone()),
        CompareOptions {
            concurrency: config.concurrency,
            ignored_headers: config.ignored_headers.clone(),
        },
        Arc::clone(&writer),
        cancel,
    );

    // Create progress reporter
    let progress = config.show_progress.then(|| Arc::new(ProgressReporter::new()));
    let ticker = progress.as_ref().map(|progress| {
        let progress = Arc::clone(progress);
        let stats = comparer.stats();
        let start = Instant::now();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(100));
            loop {
                interval.tick().await;
                progress.update(&stats.snapshot(), start.elapsed());
            }
        })
    });

    if let Some(ref p) = progress {
        p.set_status("Listing...");
    }

    let result = comparer
        .run(&config.first.prefix, &config.second.prefix)
        .await
        .context("Failed to finish report output");

    if let Some(ticker) = ticker {
        ticker.abort();
    }
    let summary = result?;

    // Finish progress
    if let Some(ref p) = progress {
        if summary.completed {
            p.finish("Comparison completed");
        } else {
            p.finish("Comparison interrupted");
        }
        print_summary(&summary);
    }

    if !summary.completed {
        info!("Comparison was interrupted before completion");
    }

    if interrupted.load(Ordering::SeqCst) {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }

    if summary.has_failures() {
        info!(errors = summary.stats.errors, "Comparison completed with errors");
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

fn open_output(target: &OutputTarget) -> s3_tree_compare::Result<Box<dyn Write + Send>> {
    match target {
        OutputTarget::Stdout => Ok(Box::new(io::stdout())),
        OutputTarget::File(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("s3_tree_compare=debug,warn")
    } else {
        EnvFilter::new("s3_tree_compare=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
