//! Metadata caching module.
//!
//! This module provides persistent storage for extracted media metadata so
//! that unchanged files are not probed again on every run.
//!
//! # Architecture
//!
//! * [`database`]: SQLite persistence and schema management.
//! * [`entry`]: File identity fingerprints and the persisted row model.
//! * [`media_info`]: The cache-assisted `get_media_info` operation.
//!
//! # Cache Invalidation
//!
//! Entries are validated using the exact combination of:
//! * File path (primary key)
//! * File size
//! * Modification time (nanoseconds)
//! * Inode change time on Unix, creation time elsewhere (nanoseconds)
//!
//! If any of these attributes differ, in either direction, the entry is
//! stale and the file is probed again. Rows for removed files are left in
//! place.

pub mod database;
pub mod entry;
pub mod media_info;

pub use database::{CacheError, CacheResult, FingerprintStore};
pub use entry::{CacheEntry, FileIdentity};
pub use media_info::{CacheStats, MediaInfoCache};
