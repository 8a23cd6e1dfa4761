//! Library run driver.
//!
//! Feeds every file the [`Walker`] yields through the [`Pipeline`], one at
//! a time, and tallies the outcomes. A failing file is logged and counted;
//! it never stops the run. The shutdown flag is only checked between files.

use std::path::{Path, PathBuf};

use crate::cache::CacheStats;
use crate::error::ExitCode;
use crate::media::MetadataExtractor;
use crate::pipeline::{FileOutcome, Pipeline};
use crate::scanner::Walker;
use crate::signal::ShutdownHandler;
use crate::transcode::Encoder;

/// A file that failed, with a one-line reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    /// The file
    pub path: PathBuf,
    /// Error category (see [`crate::error::ProcessError::kind`])
    pub kind: &'static str,
    /// Error message
    pub message: String,
}

/// Tally of a library run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Files handed to the pipeline
    pub files_processed: usize,
    /// Files that did not qualify
    pub skipped: usize,
    /// Files transcoded and replaced
    pub transcoded: usize,
    /// Files that would be transcoded (dry run)
    pub would_transcode: usize,
    /// Files that failed
    pub failed: Vec<FailedFile>,
    /// Directory entries that could not be read
    pub walk_errors: usize,
    /// Bytes saved by replacements (negative if files grew)
    pub bytes_saved: i64,
    /// Metadata cache counters for the run
    pub cache: CacheStats,
    /// Whether a shutdown request stopped the run before the walk was exhausted
    pub interrupted: bool,
}

impl RunSummary {
    fn record(&mut self, path: &Path, outcome: FileOutcome) {
        self.files_processed += 1;
        match outcome {
            FileOutcome::Skipped(_) => self.skipped += 1,
            FileOutcome::WouldTranscode => self.would_transcode += 1,
            FileOutcome::Transcoded { old_size, new_size } => {
                self.transcoded += 1;
                let delta = i128::from(old_size) - i128::from(new_size);
                self.bytes_saved = self
                    .bytes_saved
                    .saturating_add(i64::try_from(delta).unwrap_or(i64::MAX));
            }
            FileOutcome::Failed(e) => self.failed.push(FailedFile {
                path: path.to_path_buf(),
                kind: e.kind(),
                message: e.to_string(),
            }),
        }
    }

    /// Exit code matching this summary.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.interrupted {
            ExitCode::Interrupted
        } else if !self.failed.is_empty() || self.walk_errors > 0 {
            ExitCode::PartialSuccess
        } else {
            ExitCode::Success
        }
    }
}

/// Process every file of a library.
///
/// Per-file failures are logged with their path and cause and recorded in
/// the returned summary.
pub fn run_library<X, N>(
    pipeline: &Pipeline<X, N>,
    walker: &Walker,
    shutdown: &ShutdownHandler,
) -> RunSummary
where
    X: MetadataExtractor,
    N: Encoder,
{
    let mut summary = RunSummary::default();
    let stats_before = pipeline.cache().stats();

    for entry in walker.walk() {
        if shutdown.is_shutdown_requested() {
            summary.interrupted = true;
            break;
        }

        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                summary.walk_errors += 1;
                continue;
            }
        };

        log::debug!("Processing {}", path.display());
        let outcome = pipeline.process_file(&path);
        match &outcome {
            FileOutcome::Skipped(_) | FileOutcome::Transcoded { .. } => {
                log::info!("{}: {}", path.display(), outcome);
            }
            FileOutcome::WouldTranscode => {}
            FileOutcome::Failed(e) => log::error!("Failed to process file: {}", e),
        }
        summary.record(&path, outcome);
    }

    let stats_after = pipeline.cache().stats();
    summary.cache = CacheStats {
        hits: stats_after.hits - stats_before.hits,
        misses: stats_after.misses - stats_before.misses,
    };
    summary
}
