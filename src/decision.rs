//! Transcode decision policy.
//!
//! A file qualifies when it carries a video track and at least one audio
//! track in one of the target formats. Format identifiers are compared
//! ASCII case-insensitively, since extractors disagree on case (`dts` vs
//! `DTS`).

use crate::media::{MediaMetadata, TrackKind};

/// Audio format that triggers a transcode by default.
pub const DEFAULT_TARGET_FORMAT: &str = "DTS";

/// Decides which files need their audio re-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodePolicy {
    target_formats: Vec<String>,
}

impl Default for TranscodePolicy {
    fn default() -> Self {
        Self::new([DEFAULT_TARGET_FORMAT])
    }
}

impl TranscodePolicy {
    /// Create a policy triggering on any of the given audio formats.
    #[must_use]
    pub fn new<I, S>(target_formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_formats: target_formats.into_iter().map(Into::into).collect(),
        }
    }

    /// Audio formats this policy triggers on.
    #[must_use]
    pub fn target_formats(&self) -> &[String] {
        &self.target_formats
    }

    /// Whether a format identifier is one of the targets.
    #[must_use]
    pub fn is_target_format(&self, format: &str) -> bool {
        self.target_formats
            .iter()
            .any(|target| target.eq_ignore_ascii_case(format))
    }

    /// Whether the file described by `metadata` should be transcoded.
    #[must_use]
    pub fn should_transcode(&self, metadata: &MediaMetadata) -> bool {
        let mut has_video = false;
        let mut has_target_audio = false;
        for track in &metadata.tracks {
            match track.kind {
                TrackKind::Video => has_video = true,
                TrackKind::Audio if self.is_target_format(&track.format) => {
                    has_target_audio = true;
                }
                _ => {}
            }
        }
        has_video && has_target_audio
    }
}
