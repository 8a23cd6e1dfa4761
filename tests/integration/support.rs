#![allow(dead_code)]

//! Shared fixtures: in-process stand-ins for ffprobe and ffmpeg.
//!
//! A "media file" here is a text file with one `kind:format` line per
//! track, e.g. `video:h264` and `audio:DTS`. The fake probe returns the file
//! content as its raw output, and the fake encoder writes a copy with every
//! audio track turned into AAC.

use media_fixer::cache::{FingerprintStore, MediaInfoCache};
use media_fixer::decision::TranscodePolicy;
use media_fixer::media::{ExtractionError, MediaMetadata, MetadataExtractor, Track, TrackKind};
use media_fixer::pipeline::Pipeline;
use media_fixer::scanner::{Walker, WalkerConfig};
use media_fixer::signal::ShutdownHandler;
use media_fixer::transcode::{EncodeError, Encoder};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const DTS_MOVIE: &str = "video:h264\naudio:DTS\n";
pub const AAC_MOVIE: &str = "video:h264\naudio:AAC\n";

pub fn write_media(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[derive(Debug, Clone, Default)]
pub struct FakeProbe {
    calls: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MetadataExtractor for FakeProbe {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = fs::read_to_string(path).map_err(|e| ExtractionError::Rejected {
            status: "exit status: 1".to_string(),
            stderr: e.to_string(),
        })?;
        if content.starts_with("corrupt") {
            return Err(ExtractionError::Rejected {
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        Ok(content)
    }

    fn parse(&self, raw: &str) -> Result<MediaMetadata, ExtractionError> {
        let mut tracks = Vec::new();
        for line in raw.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (kind, format) = line
                .split_once(':')
                .ok_or_else(|| ExtractionError::Parse(format!("bad track line {line:?}")))?;
            let kind = match kind {
                "video" => TrackKind::Video,
                "audio" => TrackKind::Audio,
                "other" => TrackKind::Other,
                _ => return Err(ExtractionError::Parse(format!("bad track kind {kind:?}"))),
            };
            tracks.push(Track::new(kind, format));
        }
        Ok(MediaMetadata::new(tracks))
    }
}

#[derive(Debug, Clone, Default)]
enum EncoderMode {
    #[default]
    Convert,
    Fail,
    ClobberSource,
    Interrupt(ShutdownHandler),
}

#[derive(Debug, Clone, Default)]
pub struct FakeEncoder {
    calls: Arc<AtomicUsize>,
    mode: EncoderMode,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_mode(mode: EncoderMode) -> Self {
        Self {
            calls: Arc::default(),
            mode,
        }
    }

    /// An encoder that leaves a partial file behind and exits non-zero.
    pub fn failing() -> Self {
        Self::with_mode(EncoderMode::Fail)
    }

    /// Encodes normally, but swaps the source for a non-empty directory
    /// first, so the final rename cannot succeed.
    pub fn clobbering_source() -> Self {
        Self::with_mode(EncoderMode::ClobberSource)
    }

    /// Encodes normally and requests shutdown mid-encode, like a Ctrl+C
    /// arriving while ffmpeg runs.
    pub fn interrupting(shutdown: &ShutdownHandler) -> Self {
        Self::with_mode(EncoderMode::Interrupt(shutdown.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn convert(source: &Path, destination: &Path) {
    let content = fs::read_to_string(source).unwrap();
    let converted: String = content
        .lines()
        .map(|line| {
            if line.starts_with("audio:") {
                "audio:AAC\n".to_string()
            } else {
                format!("{line}\n")
            }
        })
        .collect();
    fs::write(destination, format!("# transcoded\n{converted}")).unwrap();
}

impl Encoder for FakeEncoder {
    fn encode(&self, source: &Path, destination: &Path) -> Result<(), EncodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            EncoderMode::Convert => convert(source, destination),
            EncoderMode::Fail => {
                fs::write(destination, "partial").unwrap();
                return Err(EncodeError::Failed {
                    status: "exit status: 1".to_string(),
                    stdout: String::new(),
                    stderr: "Unknown encoder 'libfdk_aac'".to_string(),
                });
            }
            EncoderMode::ClobberSource => {
                convert(source, destination);
                fs::remove_file(source).unwrap();
                fs::create_dir(source).unwrap();
                fs::write(source.join("blocker"), "x").unwrap();
            }
            EncoderMode::Interrupt(shutdown) => {
                shutdown.request_shutdown();
                convert(source, destination);
            }
        }
        Ok(())
    }
}

pub type FakePipeline = Pipeline<FakeProbe, FakeEncoder>;

pub fn pipeline(
    store: FingerprintStore,
    probe: &FakeProbe,
    encoder: &FakeEncoder,
    scratch: &Path,
) -> FakePipeline {
    let pipeline = Pipeline::new(
        MediaInfoCache::new(store, probe.clone()),
        encoder.clone(),
        TranscodePolicy::default(),
        scratch,
    );
    pipeline.prepare_scratch_dir().unwrap();
    pipeline
}

pub fn walker(library: &Path, scratch: &Path) -> Walker {
    Walker::new(
        library,
        WalkerConfig::media_defaults().with_excluded_dir(scratch),
    )
}
