//! Structured view of a media file's tracks.
//!
//! # Overview
//!
//! [`MediaMetadata`] is the in-memory form of what the metadata extractor
//! reports about a file: an ordered list of [`Track`]s, each tagged with a
//! [`TrackKind`] and the codec/format identifier the extractor reported.
//!
//! The persisted form is the extractor's own raw output (see [`probe`]), so
//! the structured view is rebuilt on every cache lookup.
//!
//! # Architecture
//!
//! * [`probe`]: The [`MetadataExtractor`] trait and the `ffprobe` implementation.

pub mod probe;

use std::fmt;

pub use probe::{ExtractionError, FfprobeExtractor, MetadataExtractor};

/// Kind of an elementary stream inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// A video stream.
    Video,
    /// An audio stream.
    Audio,
    /// Anything else (subtitles, attachments, data streams).
    Other,
}

impl TrackKind {
    /// Get the display name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single track of a media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Stream kind.
    pub kind: TrackKind,
    /// Codec or format identifier as reported by the extractor (e.g. "h264", "dts").
    pub format: String,
}

impl Track {
    /// Create a new track.
    #[must_use]
    pub fn new(kind: TrackKind, format: impl Into<String>) -> Self {
        Self {
            kind,
            format: format.into(),
        }
    }

    /// Shorthand for a video track.
    #[must_use]
    pub fn video(format: impl Into<String>) -> Self {
        Self::new(TrackKind::Video, format)
    }

    /// Shorthand for an audio track.
    #[must_use]
    pub fn audio(format: impl Into<String>) -> Self {
        Self::new(TrackKind::Audio, format)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.format)
    }
}

/// Tracks of a media file, in container order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    /// Tracks in the order the extractor reported them.
    pub tracks: Vec<Track>,
}

impl MediaMetadata {
    /// Create metadata from a list of tracks.
    #[must_use]
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Iterate over tracks of the given kind.
    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    /// Whether the file has no tracks at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl fmt::Display for MediaMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tracks.is_empty() {
            return f.write_str("[]");
        }
        f.write_str("[")?;
        for (i, track) in self.tracks.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{track}")?;
        }
        f.write_str("]")
    }
}
