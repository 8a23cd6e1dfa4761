//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config`, or `config.toml` in the platform config dir)
//! 3. Environment variables prefixed `MEDIA_FIXER_`
//! 4. Command-line flags ([`Config::apply_run_args`])

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::RunArgs;
use crate::decision::{TranscodePolicy, DEFAULT_TARGET_FORMAT};
use crate::media::FfprobeExtractor;
use crate::scanner::{WalkerConfig, DEFAULT_EXTENSIONS};
use crate::transcode::ffmpeg::{DEFAULT_AUDIO_CODEC, DEFAULT_VBR_QUALITY};
use crate::transcode::FfmpegEncoder;

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "MEDIA_FIXER_";

/// Scratch directory created under the library root when none is configured.
///
/// Encoder output is renamed over the source, so it has to live on the
/// library's filesystem.
pub const SCRATCH_DIR_NAME: &str = ".media-fixer-tmp";

/// Errors reported by [`Config::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No audio format would ever trigger a transcode.
    #[error("target_formats must name at least one audio format")]
    NoTargetFormats,

    /// VBR quality outside the encoder's range.
    #[error("vbr_quality must be between 1 and 5, got {0}")]
    VbrOutOfRange(u8),

    /// A required text setting is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Metadata cache database.
    pub cache_path: PathBuf,
    /// Directory for temporary encoder output. Unset means
    /// [`SCRATCH_DIR_NAME`] under the library root.
    pub scratch_dir: Option<PathBuf>,
    /// Encoder executable.
    pub ffmpeg_path: PathBuf,
    /// Probe executable.
    pub ffprobe_path: PathBuf,
    /// Audio formats that trigger a transcode.
    pub target_formats: Vec<String>,
    /// Replacement audio codec.
    pub audio_codec: String,
    /// VBR quality passed to the audio codec (1-5).
    pub vbr_quality: u8,
    /// Extensions considered media. Empty means every file.
    pub extensions: Vec<String>,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    /// Skip dot-files and dot-directories.
    pub skip_hidden: bool,
    /// Log file appended to alongside stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let dirs = project_dirs();

        Self {
            cache_path: dirs
                .as_ref()
                .map_or_else(|| PathBuf::from("media.db"), |d| d.cache_dir().join("media.db")),
            scratch_dir: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            target_formats: vec![DEFAULT_TARGET_FORMAT.to_string()],
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            vbr_quality: DEFAULT_VBR_QUALITY,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            follow_symlinks: false,
            skip_hidden: false,
            log_file: Some(dirs.as_ref().map_or_else(
                || PathBuf::from("media-fixer.log"),
                |d| d.data_local_dir().join("media-fixer.log"),
            )),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "media-fixer")
}

impl Config {
    /// Load the layered configuration.
    ///
    /// An explicit `config_path` must exist. Without one, the default
    /// platform config file is used if present.
    ///
    /// # Errors
    ///
    /// Fails if the explicit file is missing or any layer does not parse.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match config_path {
            Some(path) => {
                if !path.is_file() {
                    bail!("Config file not found: {}", path.display());
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::default_config_path() {
                    log::debug!("Looking for config at {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to load configuration")
    }

    /// Platform-specific location of `config.toml`.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|d| d.config_dir().join("config.toml"))
    }

    /// Overlay flags given on the command line.
    pub fn apply_run_args(&mut self, args: &RunArgs) {
        if let Some(cache) = &args.cache {
            self.cache_path.clone_from(cache);
        }
        if let Some(scratch) = &args.scratch_dir {
            self.scratch_dir = Some(scratch.clone());
        }
        if let Some(ffmpeg) = &args.ffmpeg {
            self.ffmpeg_path.clone_from(ffmpeg);
        }
        if let Some(ffprobe) = &args.ffprobe {
            self.ffprobe_path.clone_from(ffprobe);
        }
        if !args.targets.is_empty() {
            self.target_formats.clone_from(&args.targets);
        }
        if !args.extensions.is_empty() {
            self.extensions.clone_from(&args.extensions);
        }
        if let Some(log_file) = &args.log_file {
            self.log_file = Some(log_file.clone());
        }
        if args.no_log_file {
            self.log_file = None;
        }
        self.follow_symlinks |= args.follow_symlinks;
        self.skip_hidden |= args.skip_hidden;
    }

    /// Check settings that would make a run meaningless or fail every file.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_formats.iter().all(|f| f.trim().is_empty()) {
            return Err(ConfigError::NoTargetFormats);
        }
        if !(1..=5).contains(&self.vbr_quality) {
            return Err(ConfigError::VbrOutOfRange(self.vbr_quality));
        }
        if self.audio_codec.trim().is_empty() {
            return Err(ConfigError::Empty("audio_codec"));
        }
        if self.ffmpeg_path.as_os_str().is_empty() {
            return Err(ConfigError::Empty("ffmpeg_path"));
        }
        if self.ffprobe_path.as_os_str().is_empty() {
            return Err(ConfigError::Empty("ffprobe_path"));
        }
        Ok(())
    }

    /// Render as TOML, suitable for a `config.toml`.
    ///
    /// # Errors
    ///
    /// Fails only if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Transcode decision policy.
    #[must_use]
    pub fn policy(&self) -> TranscodePolicy {
        TranscodePolicy::new(
            self.target_formats
                .iter()
                .map(|f| f.trim())
                .filter(|f| !f.is_empty()),
        )
    }

    /// Probe configured with the ffprobe path.
    #[must_use]
    pub fn extractor(&self) -> FfprobeExtractor {
        FfprobeExtractor::new(&self.ffprobe_path)
    }

    /// Encoder configured with the ffmpeg path and audio settings.
    #[must_use]
    pub fn encoder(&self) -> FfmpegEncoder {
        FfmpegEncoder::new(&self.ffmpeg_path)
            .with_audio_codec(&self.audio_codec)
            .with_vbr_quality(self.vbr_quality)
    }

    /// Scratch directory used when processing `library`.
    #[must_use]
    pub fn scratch_dir_for(&self, library: &Path) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| library.join(SCRATCH_DIR_NAME))
    }

    /// Walker settings for `library`. Its scratch directory is always excluded.
    #[must_use]
    pub fn walker_config(&self, library: &Path) -> WalkerConfig {
        WalkerConfig {
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            extensions: self.extensions.clone(),
            excluded_dirs: Vec::new(),
        }
        .with_excluded_dir(self.scratch_dir_for(library))
    }
}
