//! SQLite-backed fingerprint store.
//!
//! One table, one row per path. A row is only returned for a lookup whose
//! identity matches it exactly; anything else is a miss and the caller is
//! expected to re-extract and [`FingerprintStore::upsert`].

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, ToSql};

use super::entry::{from_unix_nanos, CacheEntry, FileIdentity};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS files (
    path        TEXT    NOT NULL PRIMARY KEY,
    size        INTEGER NOT NULL,
    modified_ns INTEGER NOT NULL,
    created_ns  INTEGER NOT NULL,
    mediainfo   TEXT    NOT NULL
)";

/// Errors raised by the fingerprint store.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The database file could not be opened or initialized.
    #[error("Failed to open cache database {path}: {source}")]
    Open {
        /// Database location
        path: PathBuf,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// The directory holding the database could not be created.
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A query or write failed.
    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File size does not fit the database integer type.
    #[error("File size {0} is too large to be cached")]
    SizeOverflow(u64),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Persistent map from file identity to extracted metadata.
pub struct FingerprintStore {
    conn: Connection,
    location: Option<PathBuf>,
}

impl std::fmt::Debug for FingerprintStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintStore")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl FingerprintStore {
    /// Open (or create) the store at the given path.
    ///
    /// Schema creation is idempotent: opening an existing store never
    /// alters its contents.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Open`] if the file is not a usable SQLite
    /// database, and [`CacheError::CreateDir`] if its directory cannot be created.
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let open_err = |source| CacheError::Open {
            path: path.to_path_buf(),
            source,
        };
        let conn = Connection::open(path).map_err(open_err)?;
        Self::init(&conn).map_err(open_err)?;

        log::debug!("Opened metadata cache at {}", path.display());
        Ok(Self {
            conn,
            location: Some(path.to_path_buf()),
        })
    }

    /// Open a throwaway store that lives only as long as the value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Open`] if SQLite cannot allocate the database.
    pub fn open_in_memory() -> CacheResult<Self> {
        let open_err = |source| CacheError::Open {
            path: PathBuf::from(":memory:"),
            source,
        };
        let conn = Connection::open_in_memory().map_err(open_err)?;
        Self::init(&conn).map_err(open_err)?;
        Ok(Self {
            conn,
            location: None,
        })
    }

    fn init(conn: &Connection) -> rusqlite::Result<()> {
        // Every autocommit statement is fsync'ed before returning
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.execute_batch(SCHEMA)
    }

    /// Location of the database file, `None` for in-memory stores.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Find the entry recorded for exactly this identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn lookup(&self, identity: &FileIdentity) -> CacheResult<Option<CacheEntry>> {
        let size = size_to_sql(identity.size)?;
        let metadata: Option<String> = self
            .conn
            .query_row(
                "SELECT mediainfo FROM files
                 WHERE path = ?1 AND size = ?2 AND modified_ns = ?3 AND created_ns = ?4",
                params![
                    path_key(&identity.path),
                    size,
                    identity.modified_ns(),
                    identity.created_ns()
                ],
                |row| row.get(0),
            )
            .optional()?;

        Ok(metadata.map(|metadata| CacheEntry::new(identity, metadata)))
    }

    /// Record the metadata for an identity, replacing any row for its path.
    ///
    /// The write is committed before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be committed.
    pub fn upsert(&self, identity: &FileIdentity, metadata: &str) -> CacheResult<()> {
        let size = size_to_sql(identity.size)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO files (path, size, modified_ns, created_ns, mediainfo)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                path_key(&identity.path),
                size,
                identity.modified_ns(),
                identity.created_ns(),
                metadata
            ],
        )?;
        log::trace!("Cached media info for {}", identity.path.display());
        Ok(())
    }

    /// Get the row stored for a path regardless of whether it is still valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn entry(&self, path: &Path) -> CacheResult<Option<CacheEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT size, modified_ns, created_ns, mediainfo FROM files WHERE path = ?1",
                params![path_key(path)],
                |row| {
                    let size: i64 = row.get(0)?;
                    Ok(CacheEntry {
                        path: path.to_path_buf(),
                        size: u64::try_from(size)
                            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, size))?,
                        modified: from_unix_nanos(row.get(1)?),
                        created: from_unix_nanos(row.get(2)?),
                        metadata: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Number of rows in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn len(&self) -> CacheResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Whether the store has no rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Close the database, reporting any error on the final flush.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite fails to close cleanly.
    pub fn close(self) -> CacheResult<()> {
        self.conn.close().map_err(|(_, e)| CacheError::Sqlite(e))
    }
}

/// Primary key of a path: TEXT when it is valid UTF-8, the raw bytes as a
/// BLOB otherwise, so two distinct non-UTF-8 names never share a row.
enum PathKey<'a> {
    Text(Cow<'a, str>),
    #[cfg_attr(not(unix), allow(dead_code))]
    Bytes(&'a [u8]),
}

impl ToSql for PathKey<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

fn path_key(path: &Path) -> PathKey<'_> {
    if let Some(s) = path.to_str() {
        return PathKey::Text(Cow::Borrowed(s));
    }
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        PathKey::Bytes(path.as_os_str().as_bytes())
    }
    #[cfg(not(unix))]
    {
        PathKey::Text(path.to_string_lossy())
    }
}

fn size_to_sql(size: u64) -> CacheResult<i64> {
    i64::try_from(size).map_err(|_| CacheError::SizeOverflow(size))
}
