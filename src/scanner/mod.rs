//! Scanner module for library traversal.
//!
//! This module provides:
//! - Sequential, deterministic directory walking using walkdir
//! - Media file filtering by extension
//! - Exclusion of the scratch directory when it lives inside the library
//!
//! # Example
//!
//! ```no_run
//! use media_fixer::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     extensions: vec!["mkv".to_string()],
//!     skip_hidden: true,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/srv/videos"), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod walker;

use std::path::PathBuf;

pub use walker::Walker;

/// Container extensions considered media by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "m4v", "avi", "mov", "ts", "m2ts", "mts", "wmv", "webm",
];

/// Configuration for library walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// File extensions to include, without the dot, case-insensitive.
    /// An empty list includes every file.
    pub extensions: Vec<String>,

    /// Directories whose contents are never yielded (e.g. the scratch directory).
    pub excluded_dirs: Vec<PathBuf>,
}

impl WalkerConfig {
    /// Create a configuration with the default media extensions.
    #[must_use]
    pub fn media_defaults() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Add a directory to exclude from the walk.
    #[must_use]
    pub fn with_excluded_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded_dirs.push(dir.into());
        self
    }
}

/// Errors that can occur during library traversal.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
