//! External audio re-encoding.
//!
//! # Overview
//!
//! The encoder is a black box invoked once per qualifying file: it reads the
//! source, writes a complete new container to a destination path, and
//! reports success through its exit status. The pipeline never lets an
//! encoder write to the source path directly.
//!
//! # Architecture
//!
//! * [`ffmpeg`]: The `ffmpeg` subprocess implementation.

pub mod ffmpeg;

use std::path::{Path, PathBuf};

pub use ffmpeg::FfmpegEncoder;

/// Errors reported by an encoder run.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    /// The encoder process could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that was invoked
        program: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The encoder ran and exited unsuccessfully.
    #[error("encoder exited with status {status}")]
    Failed {
        /// Exit status description
        status: String,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// The encoder reported success but left no usable output file.
    #[error("encoder produced no output at {destination}")]
    MissingOutput {
        /// Where the output was expected
        destination: PathBuf,
    },
}

impl EncodeError {
    /// Captured (stdout, stderr) of a failed run, if the process ran at all.
    #[must_use]
    pub fn captured_output(&self) -> Option<(&str, &str)> {
        match self {
            Self::Failed { stdout, stderr, .. } => Some((stdout.as_str(), stderr.as_str())),
            Self::Launch { .. } | Self::MissingOutput { .. } => None,
        }
    }
}

/// Re-encodes the audio of a media file into a new file.
pub trait Encoder {
    /// Transcode `source` into `destination`, blocking until done.
    ///
    /// Implementations must not modify `source`. On error, `destination` may
    /// be missing or hold a partial file.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the encoder cannot be started or fails.
    fn encode(&self, source: &Path, destination: &Path) -> Result<(), EncodeError>;
}
