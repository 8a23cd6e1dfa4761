//! Per-file transcode-and-replace pipeline.
//!
//! # Overview
//!
//! For one file the pipeline:
//! 1. Gets its metadata through the [`MediaInfoCache`]
//! 2. Asks the [`TranscodePolicy`] whether it qualifies
//! 3. Runs the [`Encoder`] into `scratch_dir/<file name>`
//! 4. Renames the output over the source
//! 5. Re-reads the metadata of the new file so the cache holds the new identity
//!
//! Step 4 is the only step that touches the source. If the encoder fails
//! the partial output is removed (best effort) and the source is left as it
//! was. The scratch directory must live on the same filesystem as the
//! library for the rename to be atomic; a cross-device rename fails and is
//! reported as [`ProcessError::Replace`].

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;

use crate::cache::MediaInfoCache;
use crate::decision::TranscodePolicy;
use crate::error::ProcessError;
use crate::media::{MediaMetadata, MetadataExtractor};
use crate::transcode::{EncodeError, Encoder};

/// Result of running one file through the pipeline.
#[derive(Debug)]
pub enum FileOutcome {
    /// The file does not qualify; nothing was changed.
    Skipped(MediaMetadata),
    /// The file qualifies but the pipeline runs in dry-run mode.
    WouldTranscode,
    /// The file was transcoded and replaced in place.
    Transcoded {
        /// Size before replacement
        old_size: u64,
        /// Size after replacement
        new_size: u64,
    },
    /// Processing failed; see the error for whether the source was touched.
    Failed(ProcessError),
}

impl FileOutcome {
    /// Whether this outcome is a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped(metadata) => write!(f, "skipped {metadata}"),
            Self::WouldTranscode => f.write_str("would transcode"),
            Self::Transcoded { old_size, new_size } => write!(
                f,
                "transcoded ({} -> {})",
                ByteSize(*old_size),
                ByteSize(*new_size)
            ),
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Metadata and verdict for a single file, without side effects beyond caching.
#[derive(Debug, Clone)]
pub struct Inspection {
    /// Tracks of the file
    pub metadata: MediaMetadata,
    /// Whether the policy selects the file for transcoding
    pub should_transcode: bool,
}

/// Transcode pipeline shared by every file of a run.
#[derive(Debug)]
pub struct Pipeline<X, N> {
    cache: MediaInfoCache<X>,
    encoder: N,
    policy: TranscodePolicy,
    scratch_dir: PathBuf,
    dry_run: bool,
}

impl<X: MetadataExtractor, N: Encoder> Pipeline<X, N> {
    /// Create a pipeline writing encoder output into `scratch_dir`.
    #[must_use]
    pub fn new(
        cache: MediaInfoCache<X>,
        encoder: N,
        policy: TranscodePolicy,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cache,
            encoder,
            policy,
            scratch_dir: scratch_dir.into(),
            dry_run: false,
        }
    }

    /// Only report what would be transcoded.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Create the scratch directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the directory cannot be created.
    pub fn prepare_scratch_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.scratch_dir)
    }

    /// Check that the scratch directory shares a filesystem with `library`.
    ///
    /// Replacing a source is a rename, which cannot cross devices.
    ///
    /// # Errors
    ///
    /// Returns an error if either path cannot be stat'ed or their device
    /// ids differ.
    pub fn check_same_filesystem(&self, library: &Path) -> io::Result<()> {
        same_filesystem(&self.scratch_dir, library)
    }

    /// The metadata cache.
    #[must_use]
    pub fn cache(&self) -> &MediaInfoCache<X> {
        &self.cache
    }

    /// The decision policy.
    #[must_use]
    pub fn policy(&self) -> &TranscodePolicy {
        &self.policy
    }

    /// Where encoder output is staged.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Whether the pipeline runs in dry-run mode.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Give back the metadata cache.
    #[must_use]
    pub fn into_cache(self) -> MediaInfoCache<X> {
        self.cache
    }

    /// Staging path for a source file: its base name inside the scratch directory.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Filesystem`] if the path has no file name.
    pub fn temp_path(&self, source: &Path) -> Result<PathBuf, ProcessError> {
        source
            .file_name()
            .map(|name| self.scratch_dir.join(name))
            .ok_or_else(|| ProcessError::Filesystem {
                path: source.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            })
    }

    /// Get a file's metadata and the policy verdict without transcoding.
    ///
    /// # Errors
    ///
    /// Propagates metadata extraction and cache errors.
    pub fn inspect(&self, path: &Path) -> Result<Inspection, ProcessError> {
        let metadata = self.cache.get_media_info(path)?;
        let should_transcode = self.policy.should_transcode(&metadata);
        Ok(Inspection {
            metadata,
            should_transcode,
        })
    }

    /// Run one file through the pipeline.
    ///
    /// Never panics on a bad file; every failure is returned as
    /// [`FileOutcome::Failed`].
    pub fn process_file(&self, path: &Path) -> FileOutcome {
        match self.try_process(path) {
            Ok(outcome) => outcome,
            Err(e) => FileOutcome::Failed(e),
        }
    }

    fn try_process(&self, path: &Path) -> Result<FileOutcome, ProcessError> {
        let metadata = self.cache.get_media_info(path)?;
        if !self.policy.should_transcode(&metadata) {
            return Ok(FileOutcome::Skipped(metadata));
        }

        let temp = self.temp_path(path)?;
        if self.dry_run {
            log::info!("Would transcode {} ({})", path.display(), metadata);
            return Ok(FileOutcome::WouldTranscode);
        }

        let old_size = file_size(path)?;

        log::info!("Transcoding {} to {}", path.display(), temp.display());
        if let Err(source) = self.encode_checked(path, &temp) {
            if let Some((stdout, stderr)) = source.captured_output() {
                log::error!(
                    "Failed to transcode {}, stdout:\n{}\n\nstderr:\n{}",
                    path.display(),
                    stdout,
                    stderr
                );
            }
            remove_partial_output(&temp);
            return Err(ProcessError::Encode {
                path: path.to_path_buf(),
                source,
            });
        }
        log::info!("Successfully transcoded {}", path.display());

        fs::rename(&temp, path).map_err(|source| {
            log::error!(
                "Could not move {} over {}; the transcoded file is only in the scratch directory",
                temp.display(),
                path.display()
            );
            ProcessError::Replace {
                temp: temp.clone(),
                target: path.to_path_buf(),
                source,
            }
        })?;

        // The old identity is stale now, so this is a miss that re-extracts
        let refreshed = self.cache.get_media_info(path)?;
        if self.policy.should_transcode(&refreshed) {
            log::warn!(
                "{} still qualifies after transcoding: {}",
                path.display(),
                refreshed
            );
        }

        let new_size = file_size(path)?;
        Ok(FileOutcome::Transcoded { old_size, new_size })
    }

    /// Run the encoder and make sure it left a non-empty file behind.
    fn encode_checked(&self, source: &Path, temp: &Path) -> Result<(), EncodeError> {
        self.encoder.encode(source, temp)?;
        match fs::metadata(temp) {
            Ok(m) if m.is_file() && m.len() > 0 => Ok(()),
            _ => Err(EncodeError::MissingOutput {
                destination: temp.to_path_buf(),
            }),
        }
    }
}

#[cfg(unix)]
fn same_filesystem(scratch: &Path, library: &Path) -> io::Result<()> {
    use std::os::unix::fs::MetadataExt;

    let scratch_dev = fs::metadata(scratch)?.dev();
    let library_dev = fs::metadata(library)?.dev();
    if scratch_dev == library_dev {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "scratch directory {} is not on the same filesystem as {}",
            scratch.display(),
            library.display()
        )))
    }
}

#[cfg(not(unix))]
fn same_filesystem(_scratch: &Path, _library: &Path) -> io::Result<()> {
    Ok(())
}

fn file_size(path: &Path) -> Result<u64, ProcessError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| ProcessError::Filesystem {
            path: path.to_path_buf(),
            source,
        })
}

/// Best-effort removal of an encoder's partial output.
fn remove_partial_output(temp: &Path) {
    match fs::remove_file(temp) {
        Ok(()) => log::debug!("Removed partial output {}", temp.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove partial output {}: {}", temp.display(), e),
    }
}
