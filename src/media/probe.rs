//! Metadata extraction through `ffprobe`.
//!
//! # Overview
//!
//! The extractor runs as an external process and reports the streams of a
//! container as JSON. That JSON is kept verbatim as the cache blob: the
//! extractor is the only component that knows how to read it, so
//! [`MetadataExtractor::parse`] is used both right after extraction and on
//! every cache hit.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use super::{MediaMetadata, Track, TrackKind};

/// Errors reported by a metadata extractor.
#[derive(thiserror::Error, Debug)]
pub enum ExtractionError {
    /// The extractor process could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that was invoked
        program: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The extractor ran but rejected the file.
    #[error("extractor exited with status {status}: {stderr}")]
    Rejected {
        /// Exit status description
        status: String,
        /// Captured standard error (trimmed)
        stderr: String,
    },

    /// The extractor output could not be understood.
    #[error("unreadable extractor output: {0}")]
    Parse(String),
}

/// Source of structured track information for a file.
///
/// Implementations must be able to [`parse`](Self::parse) whatever
/// [`extract`](Self::extract) returns, including output produced by an
/// earlier run and read back from the cache.
pub trait MetadataExtractor {
    /// Run the extractor against a file and return its raw, serialized output.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] if the file cannot be read or is rejected.
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;

    /// Rebuild structured metadata from raw extractor output.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Parse`] if the blob is not valid output.
    fn parse(&self, raw: &str) -> Result<MediaMetadata, ExtractionError>;
}

/// Raw `ffprobe -show_streams` JSON layout (only the fields we read).
mod ffprobe {
    use super::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ProbeOutput {
        #[serde(default)]
        pub streams: Vec<Stream>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Stream {
        pub codec_type: Option<String>,
        pub codec_name: Option<String>,
        pub disposition: Option<Disposition>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Disposition {
        pub attached_pic: Option<i32>,
    }
}

/// [`MetadataExtractor`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeExtractor {
    program: PathBuf,
}

impl Default for FfprobeExtractor {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeExtractor {
    /// Create an extractor invoking the given `ffprobe` executable.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Path of the executable this extractor runs.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn convert_stream(stream: ffprobe::Stream) -> Track {
        // Embedded cover art is reported as a video stream
        let attached_pic = stream
            .disposition
            .as_ref()
            .and_then(|d| d.attached_pic)
            .is_some_and(|v| v != 0);

        let kind = match stream.codec_type.as_deref() {
            Some("video") if !attached_pic => TrackKind::Video,
            Some("audio") => TrackKind::Audio,
            _ => TrackKind::Other,
        };

        Track::new(kind, stream.codec_name.unwrap_or_default())
    }
}

impl MetadataExtractor for FfprobeExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        log::debug!("Parsing media info from {}", path.display());

        let output = Command::new(&self.program)
            .args(["-v", "error"])
            .args(["-print_format", "json"])
            .arg("-show_streams")
            .arg(path)
            .output()
            .map_err(|source| ExtractionError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Rejected {
                status: output.status.to_string(),
                stderr: if stderr.trim().is_empty() {
                    "no error output".to_string()
                } else {
                    stderr.trim().to_string()
                },
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|e| ExtractionError::Parse(format!("output is not UTF-8: {e}")))
    }

    fn parse(&self, raw: &str) -> Result<MediaMetadata, ExtractionError> {
        let probe: ffprobe::ProbeOutput =
            serde_json::from_str(raw).map_err(|e| ExtractionError::Parse(e.to_string()))?;

        Ok(MediaMetadata::new(
            probe.streams.into_iter().map(Self::convert_stream).collect(),
        ))
    }
}
