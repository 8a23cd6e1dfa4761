//! Command-line interface definitions for media-fixer.
//!
//! This module defines all CLI arguments and subcommands using the clap derive API.
//! Global options (verbosity, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Transcode every DTS track in a library
//! media-fixer run /srv/videos
//!
//! # Report what would be transcoded, without touching anything
//! media-fixer run /srv/videos --dry-run
//!
//! # Also replace TrueHD, with a custom cache location
//! media-fixer run /srv/videos --target DTS --target TrueHD --cache ~/media.db
//!
//! # Show the tracks of one file
//! media-fixer -v inspect /srv/videos/movie.mkv
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Replace unsupported audio tracks in a media library.
///
/// Walks a library, reads each file's track list (cached in SQLite), and
/// re-encodes the audio of files whose audio format is not playable on the
/// target devices, copying the video stream unchanged.
#[derive(Debug, Parser)]
#[command(name = "media-fixer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML)
    ///
    /// Defaults to config.toml in the platform configuration directory.
    #[arg(long, global = true, value_name = "PATH", env = "MEDIA_FIXER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Process every media file of a library
    Run(RunArgs),
    /// Show the tracks of a single file and whether it would be transcoded
    Inspect(InspectArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Arguments for the run subcommand.
#[derive(Debug, Args, Default)]
pub struct RunArgs {
    /// Library root directory
    #[arg(value_name = "LIBRARY")]
    pub library: PathBuf,

    /// Report files that would be transcoded without running the encoder
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Path to the metadata cache database
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Directory for temporary encoder output
    ///
    /// Should be on the same filesystem as the library so the final
    /// rename is atomic.
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe executable
    #[arg(long, value_name = "PATH")]
    pub ffprobe: Option<PathBuf>,

    /// Audio format that triggers a transcode (repeatable, default: DTS)
    #[arg(short, long = "target", value_name = "FORMAT")]
    pub targets: Vec<String>,

    /// File extension to consider (repeatable, replaces the default list)
    #[arg(short, long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Append log records to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log to stderr only
    #[arg(long, conflicts_with = "log_file")]
    pub no_log_file: bool,

    /// Follow symbolic links during the walk
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,
}

/// Arguments for the inspect subcommand.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Media file to inspect
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Path to the metadata cache database
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// ffprobe executable
    #[arg(long, value_name = "PATH")]
    pub ffprobe: Option<PathBuf>,

    /// Audio format that triggers a transcode (repeatable, default: DTS)
    #[arg(short, long = "target", value_name = "FORMAT")]
    pub targets: Vec<String>,
}

impl InspectArgs {
    /// The overlapping flags, expressed as run flags for config overlay.
    #[must_use]
    pub fn as_run_args(&self) -> RunArgs {
        RunArgs {
            library: self.file.clone(),
            cache: self.cache.clone(),
            ffprobe: self.ffprobe.clone(),
            targets: self.targets.clone(),
            ..RunArgs::default()
        }
    }
}
