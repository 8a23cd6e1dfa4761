//! Library walker implementation using walkdir.
//!
//! # Overview
//!
//! The walker yields candidate media files one at a time, in file-name
//! order within each directory, so that a run over an unchanged library
//! always visits files in the same order.
//!
//! # Features
//!
//! - Sorted, sequential traversal
//! - Configurable symlink following (walkdir detects loops)
//! - Hidden file filtering
//! - Extension filtering
//! - Excluded directories are pruned, not just filtered
//!
//! Shutdown is not handled here: the runner checks its flag before each
//! file it takes from the walk.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::{ScanError, WalkerConfig};

/// Sequential directory walker for media discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given library root.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Check that the root exists and is a directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotFound`], [`ScanError::NotADirectory`] or
    /// [`ScanError::PermissionDenied`] for an unusable root.
    pub fn check_root(&self) -> Result<(), ScanError> {
        match std::fs::metadata(&self.root) {
            Ok(m) if m.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::NotADirectory(self.root.clone())),
            Err(e) => Err(self.io_error(&self.root, e)),
        }
    }

    /// Whether a file name passes the extension filter.
    fn passes_extension_filter(&self, path: &Path) -> bool {
        if self.config.extensions.is_empty() {
            return true;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.config
            .extensions
            .iter()
            .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    fn is_hidden(entry: &DirEntry) -> bool {
        entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
    }

    /// Walk the library, yielding paths of candidate files.
    ///
    /// The root is canonicalized when possible so that cache keys do not
    /// depend on the working directory. Errors are yielded as [`ScanError`]
    /// values rather than stopping iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        let root = std::fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        let excluded: Vec<PathBuf> = self
            .config
            .excluded_dirs
            .iter()
            .map(|dir| std::fs::canonicalize(dir).unwrap_or_else(|_| dir.clone()))
            .collect();
        let skip_hidden = self.config.skip_hidden;

        WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                if skip_hidden && Self::is_hidden(entry) {
                    log::trace!("Skipping hidden entry: {}", entry.path().display());
                    return false;
                }
                if entry.file_type().is_dir() && excluded.iter().any(|d| d == entry.path()) {
                    log::debug!("Skipping excluded directory: {}", entry.path().display());
                    return false;
                }
                true
            })
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        return None;
                    }
                    let path = entry.into_path();
                    if !self.passes_extension_filter(&path) {
                        log::trace!("Skipping non-media file: {}", path.display());
                        return None;
                    }
                    Some(Ok(path))
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), Path::to_path_buf);
                    let source: io::Error = e.into();
                    Some(Err(self.io_error(&path, source)))
                }
            })
    }

    fn io_error(&self, path: &Path, source: io::Error) -> ScanError {
        match source.kind() {
            io::ErrorKind::NotFound => ScanError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(path.to_path_buf()),
            _ => ScanError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}
