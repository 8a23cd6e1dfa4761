//! Per-file error taxonomy and process exit codes.

use std::path::PathBuf;

use crate::cache::CacheError;
use crate::media::ExtractionError;
use crate::transcode::EncodeError;

/// Why processing a single file failed.
///
/// None of these abort a run: the runner logs them with the file path and
/// moves on to the next file.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// Metadata extraction failed.
    #[error("Failed to extract media info from {path}: {source}")]
    Extraction {
        /// File being probed
        path: PathBuf,
        /// The extractor error
        #[source]
        source: ExtractionError,
    },

    /// The encoder could not be launched or exited unsuccessfully.
    #[error("Failed to transcode {path}: {source}")]
    Encode {
        /// Source file (left untouched)
        path: PathBuf,
        /// The encoder error, including captured output
        #[source]
        source: EncodeError,
    },

    /// A freshly extracted entry could not be committed to the cache.
    #[error("Failed to update media info cache for {path}: {source}")]
    CacheWrite {
        /// File whose entry was being written
        path: PathBuf,
        /// The cache error
        #[source]
        source: CacheError,
    },

    /// The file could not be accessed.
    #[error("I/O error for {path}: {source}")]
    Filesystem {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The transcoded file could not be moved over the source.
    ///
    /// The source is unchanged; the new content is only at `temp`.
    #[error("Failed to replace {target} with {temp}: {source}")]
    Replace {
        /// Transcoded output in the scratch directory
        temp: PathBuf,
        /// Source file that should have been replaced
        target: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Short machine-friendly label for summaries.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Extraction { .. } => "extraction",
            Self::Encode { .. } => "encode",
            Self::CacheWrite { .. } => "cache-write",
            Self::Filesystem { .. } => "filesystem",
            Self::Replace { .. } => "replace",
        }
    }
}

/// Exit codes for the media-fixer application.
///
/// - 0: Success (whole library processed, no per-file failures)
/// - 1: General error (startup failure: config, cache or scratch directory)
/// - 3: Partial success (library processed, some files failed)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success: every file was processed without error.
    Success = 0,
    /// General error: the run could not start.
    GeneralError = 1,
    /// Partial success: the run completed but some files failed.
    PartialSuccess = 3,
    /// Interrupted: the run was stopped between files by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "MF000",
            Self::GeneralError => "MF001",
            Self::PartialSuccess => "MF003",
            Self::Interrupted => "MF130",
        }
    }
}
