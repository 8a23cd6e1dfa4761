//! media-fixer - Media Library Audio Fixer
//!
//! Walks a media library and re-encodes the audio of files whose audio
//! tracks are in a format the playback devices cannot handle (DTS by
//! default), copying the video stream untouched. Track listings are cached
//! in SQLite keyed by path, size and timestamps, so repeated runs over an
//! unchanged library do not re-probe every file.

pub mod cache;
pub mod cli;
pub mod config;
pub mod decision;
pub mod error;
pub mod logging;
pub mod media;
pub mod pipeline;
pub mod runner;
pub mod scanner;
pub mod signal;
pub mod transcode;

use anyhow::{Context, Result};
use bytesize::ByteSize;
use std::path::Path;

use crate::cache::{FingerprintStore, MediaInfoCache};
use crate::cli::{Cli, Commands, InspectArgs, RunArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::pipeline::Pipeline;
use crate::runner::{run_library, RunSummary};
use crate::scanner::Walker;
use crate::signal::ShutdownHandler;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for anything that prevents the run from starting:
/// bad configuration, an unusable library root, or a cache that cannot be
/// opened. Failures of individual files are not errors here; they are
/// reflected in the returned [`ExitCode`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => {
            config.apply_run_args(&args);
            config.validate().context("Invalid configuration")?;
            logging::init_logging(cli.verbose, cli.quiet, config.log_file.as_deref())?;
            run(&config, &args)
        }
        Commands::Inspect(args) => {
            config.apply_run_args(&args.as_run_args());
            config.validate().context("Invalid configuration")?;
            logging::init_logging(cli.verbose, cli.quiet, None)?;
            inspect(&config, &args)
        }
        Commands::Config => {
            config.validate().context("Invalid configuration")?;
            print!("{}", config.to_toml()?);
            Ok(ExitCode::Success)
        }
    }
}

fn open_store(config: &Config) -> Result<FingerprintStore> {
    FingerprintStore::open(&config.cache_path).with_context(|| {
        format!(
            "Failed to open metadata cache at {}",
            config.cache_path.display()
        )
    })
}

fn run(config: &Config, args: &RunArgs) -> Result<ExitCode> {
    let shutdown = match signal::install_handler() {
        Ok(handler) => handler,
        Err(e) => {
            log::warn!("{}; Ctrl+C will stop the run immediately", e);
            ShutdownHandler::new()
        }
    };

    let walker = Walker::new(&args.library, config.walker_config(&args.library));
    walker
        .check_root()
        .with_context(|| format!("Cannot process library {}", args.library.display()))?;

    let store = open_store(config)?;
    log::debug!("Metadata cache: {}", config.cache_path.display());

    let scratch_dir = config.scratch_dir_for(&args.library);
    let pipeline = Pipeline::new(
        MediaInfoCache::new(store, config.extractor()),
        config.encoder(),
        config.policy(),
        &scratch_dir,
    )
    .with_dry_run(args.dry_run);

    if !args.dry_run {
        pipeline.prepare_scratch_dir().with_context(|| {
            format!(
                "Failed to create scratch directory {}",
                scratch_dir.display()
            )
        })?;
        pipeline
            .check_same_filesystem(&args.library)
            .context("Unusable scratch directory")?;
    }

    log::info!(
        "Processing {} (targets: {})",
        args.library.display(),
        pipeline.policy().target_formats().join(", ")
    );
    let summary = run_library(&pipeline, &walker, &shutdown);
    log_summary(&summary, args.dry_run);

    if let Err(e) = pipeline.into_cache().into_store().close() {
        log::warn!("Failed to close metadata cache cleanly: {}", e);
    }

    Ok(summary.exit_code())
}

fn log_summary(summary: &RunSummary, dry_run: bool) {
    if summary.interrupted {
        log::warn!("Run interrupted after {} files", summary.files_processed);
    }
    if dry_run {
        log::info!(
            "Checked {} files: {} would be transcoded, {} skipped, {} failed",
            summary.files_processed,
            summary.would_transcode,
            summary.skipped,
            summary.failed.len()
        );
    } else {
        let saved = if summary.bytes_saved >= 0 {
            ByteSize(summary.bytes_saved.unsigned_abs()).to_string()
        } else {
            format!("-{}", ByteSize(summary.bytes_saved.unsigned_abs()))
        };
        log::info!(
            "Processed {} files: {} transcoded ({} saved), {} skipped, {} failed",
            summary.files_processed,
            summary.transcoded,
            saved,
            summary.skipped,
            summary.failed.len()
        );
    }
    log::info!(
        "Metadata cache: {} hits, {} misses",
        summary.cache.hits,
        summary.cache.misses
    );
    if summary.walk_errors > 0 {
        log::warn!("{} directory entries could not be read", summary.walk_errors);
    }
    for failure in &summary.failed {
        log::warn!("  [{}] {}", failure.kind, failure.path.display());
    }
}

fn inspect(config: &Config, args: &InspectArgs) -> Result<ExitCode> {
    let store = open_store(config)?;
    let parent = args.file.parent().unwrap_or_else(|| Path::new("."));
    let pipeline = Pipeline::new(
        MediaInfoCache::new(store, config.extractor()),
        config.encoder(),
        config.policy(),
        config.scratch_dir_for(parent),
    );

    let inspection = pipeline
        .inspect(&args.file)
        .with_context(|| format!("Failed to inspect {}", args.file.display()))?;

    println!("{}", args.file.display());
    if inspection.metadata.is_empty() {
        println!("  (no tracks)");
    }
    for track in &inspection.metadata.tracks {
        println!("  {}: {}", track.kind, track.format);
    }
    println!(
        "  Transcode: {}",
        if inspection.should_transcode { "yes" } else { "no" }
    );

    Ok(ExitCode::Success)
}
