//! End-to-end runs through the real subprocess wrappers, with small shell
//! scripts standing in for ffprobe and ffmpeg.
#![cfg(unix)]

use media_fixer::cache::{FingerprintStore, MediaInfoCache};
use media_fixer::decision::TranscodePolicy;
use media_fixer::error::ExitCode;
use media_fixer::media::{FfprobeExtractor, Track};
use media_fixer::pipeline::Pipeline;
use media_fixer::runner::run_library;
use media_fixer::scanner::{Walker, WalkerConfig};
use media_fixer::signal::ShutdownHandler;
use media_fixer::transcode::FfmpegEncoder;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const PROBE_SCRIPT: &str = r#"#!/bin/sh
for last; do :; done
if grep -q aac "$last"; then
  echo '{"streams":[{"codec_type":"video","codec_name":"h264"},{"codec_type":"audio","codec_name":"aac"}]}'
else
  echo '{"streams":[{"codec_type":"video","codec_name":"h264"},{"codec_type":"audio","codec_name":"dts"}]}'
fi
"#;

const ENCODE_SCRIPT: &str = r#"#!/bin/sh
for last; do :; done
printf 'aac movie, re-encoded' > "$last"
"#;

const FAILING_ENCODE_SCRIPT: &str = r#"#!/bin/sh
for last; do :; done
printf 'half' > "$last"
echo "Unknown encoder 'libfdk_aac'" >&2
exit 1
"#;

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn test_run_with_subprocess_tools() {
    let root = tempdir().unwrap();
    let base = fs::canonicalize(root.path()).unwrap();
    let bin = base.join("bin");
    let library = base.join("videos");
    let scratch = base.join("scratch");
    fs::create_dir_all(&bin).unwrap();
    fs::create_dir_all(&library).unwrap();

    let probe = script(&bin, "ffprobe", PROBE_SCRIPT);
    let ffmpeg = script(&bin, "ffmpeg", ENCODE_SCRIPT);
    let broken_ffmpeg = script(&bin, "ffmpeg-broken", FAILING_ENCODE_SCRIPT);

    let a = library.join("A.mkv");
    let b = library.join("B.mkv");
    fs::write(&a, "dts movie").unwrap();
    fs::write(&b, "aac movie").unwrap();

    // A failing encoder leaves the source alone and cleans up
    {
        let pipeline = Pipeline::new(
            MediaInfoCache::new(
                FingerprintStore::open_in_memory().unwrap(),
                FfprobeExtractor::new(&probe),
            ),
            FfmpegEncoder::new(&broken_ffmpeg),
            TranscodePolicy::default(),
            &scratch,
        );
        pipeline.prepare_scratch_dir().unwrap();

        let summary = run_library(
            &pipeline,
            &Walker::new(&library, WalkerConfig::media_defaults()),
            &ShutdownHandler::new(),
        );
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].kind, "encode");
        assert_eq!(summary.exit_code(), ExitCode::PartialSuccess);
        assert_eq!(fs::read_to_string(&a).unwrap(), "dts movie");
        assert!(!scratch.join("A.mkv").exists());
    }

    let pipeline = Pipeline::new(
        MediaInfoCache::new(
            FingerprintStore::open_in_memory().unwrap(),
            FfprobeExtractor::new(&probe),
        ),
        FfmpegEncoder::new(&ffmpeg),
        TranscodePolicy::default(),
        &scratch,
    );
    let summary = run_library(
        &pipeline,
        &Walker::new(&library, WalkerConfig::media_defaults()),
        &ShutdownHandler::new(),
    );

    assert_eq!(summary.transcoded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.exit_code(), ExitCode::Success);
    assert_eq!(fs::read_to_string(&a).unwrap(), "aac movie, re-encoded");
    assert_eq!(fs::read_to_string(&b).unwrap(), "aac movie");

    let refreshed = pipeline.inspect(&a).unwrap();
    assert!(!refreshed.should_transcode);
    assert!(refreshed.metadata.tracks.contains(&Track::audio("aac")));
    assert_eq!(pipeline.cache().stats().hits, 1);
}
