//! FFmpeg subprocess handling for audio re-encoding.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{EncodeError, Encoder};

/// Default audio encoder passed to `-c:a`.
pub const DEFAULT_AUDIO_CODEC: &str = "libfdk_aac";

/// Default variable bitrate mode passed to `-vbr` (1 = lowest, 5 = highest).
pub const DEFAULT_VBR_QUALITY: u8 = 5;

/// [`Encoder`] that copies video and re-encodes audio with `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
    audio_codec: String,
    vbr_quality: u8,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegEncoder {
    /// Create an encoder invoking the given `ffmpeg` executable with default settings.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            vbr_quality: DEFAULT_VBR_QUALITY,
        }
    }

    /// Set the audio encoder name.
    #[must_use]
    pub fn with_audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.audio_codec = codec.into();
        self
    }

    /// Set the VBR quality level.
    #[must_use]
    pub fn with_vbr_quality(mut self, quality: u8) -> Self {
        self.vbr_quality = quality;
        self
    }

    /// Build the argument list for one run.
    ///
    /// `-y` makes a leftover file at `destination` from an earlier crashed
    /// run get overwritten instead of blocking on a prompt.
    #[must_use]
    pub fn args(&self, source: &Path, destination: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-nostdin", "-hide_banner", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(source.as_os_str().to_owned());
        for arg in ["-c:v", "copy", "-c:a", self.audio_codec.as_str(), "-vbr"] {
            args.push(arg.into());
        }
        args.push(self.vbr_quality.to_string().into());
        args.push(destination.as_os_str().to_owned());
        args
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(&self, source: &Path, destination: &Path) -> Result<(), EncodeError> {
        log::debug!(
            "Running {} with audio codec {} (vbr {})",
            self.program.display(),
            self.audio_codec,
            self.vbr_quality
        );

        let output = Command::new(&self.program)
            .args(self.args(source, destination))
            .output()
            .map_err(|source| EncodeError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(EncodeError::Failed {
                status: output.status.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
