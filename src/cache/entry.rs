//! File identity fingerprints and persisted cache rows.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Cheap proxy for "file contents unchanged".
///
/// Captured from live filesystem attributes; never stored on its own. Two
/// identities match only if all four fields are exactly equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    /// Path of the file as given to the pipeline
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
    /// Inode change time on Unix, creation time elsewhere
    pub created: SystemTime,
}

impl FileIdentity {
    /// Capture the identity of a file on disk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be stat'ed.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self::from_metadata(path.to_path_buf(), &metadata))
    }

    /// Build an identity from already fetched metadata.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        Self {
            path,
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(UNIX_EPOCH),
            created: created_time(metadata),
        }
    }

    /// Modification time in nanoseconds since the Unix epoch.
    #[must_use]
    pub fn modified_ns(&self) -> i64 {
        to_unix_nanos(self.modified)
    }

    /// Change/creation time in nanoseconds since the Unix epoch.
    #[must_use]
    pub fn created_ns(&self) -> i64 {
        to_unix_nanos(self.created)
    }
}

#[cfg(unix)]
fn created_time(metadata: &Metadata) -> SystemTime {
    use std::os::unix::fs::MetadataExt;
    let nanos = metadata
        .ctime()
        .saturating_mul(1_000_000_000)
        .saturating_add(metadata.ctime_nsec());
    from_unix_nanos(nanos)
}

#[cfg(not(unix))]
fn created_time(metadata: &Metadata) -> SystemTime {
    metadata.created().unwrap_or(UNIX_EPOCH)
}

/// Convert a timestamp to signed nanoseconds since the Unix epoch.
///
/// Saturates at the `i64` range (roughly years 1677 to 2262).
#[must_use]
pub fn to_unix_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_nanos()).map_or(i64::MIN, |n| -n),
    }
}

/// Inverse of [`to_unix_nanos`].
#[must_use]
pub fn from_unix_nanos(nanos: i64) -> SystemTime {
    if nanos >= 0 {
        UNIX_EPOCH + Duration::from_nanos(nanos.unsigned_abs())
    } else {
        UNIX_EPOCH - Duration::from_nanos(nanos.unsigned_abs())
    }
}

/// A row of the metadata cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Path of the file (primary key)
    pub path: PathBuf,
    /// Size at extraction time
    pub size: u64,
    /// Modification time at extraction time
    pub modified: SystemTime,
    /// Change/creation time at extraction time
    pub created: SystemTime,
    /// Raw extractor output
    pub metadata: String,
}

impl CacheEntry {
    /// Create an entry for an identity and its extracted blob.
    #[must_use]
    pub fn new(identity: &FileIdentity, metadata: impl Into<String>) -> Self {
        Self {
            path: identity.path.clone(),
            size: identity.size,
            modified: identity.modified,
            created: identity.created,
            metadata: metadata.into(),
        }
    }

    /// The identity this entry was recorded for.
    #[must_use]
    pub fn identity(&self) -> FileIdentity {
        FileIdentity {
            path: self.path.clone(),
            size: self.size,
            modified: self.modified,
            created: self.created,
        }
    }

    /// Whether this entry is still valid for the given live identity.
    #[must_use]
    pub fn matches(&self, identity: &FileIdentity) -> bool {
        self.identity() == *identity
    }
}
