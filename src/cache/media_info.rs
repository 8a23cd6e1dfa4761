//! Cache-assisted metadata extraction.

use std::cell::Cell;
use std::path::Path;

use super::database::FingerprintStore;
use super::entry::FileIdentity;
use crate::error::ProcessError;
use crate::media::{MediaMetadata, MetadataExtractor};

/// Hit/miss counters for a [`MediaInfoCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the store
    pub hits: usize,
    /// Lookups that ran the extractor
    pub misses: usize,
}

/// Fingerprint store paired with the extractor that fills it.
///
/// [`get_media_info`](Self::get_media_info) only runs the extractor when the
/// file's live identity has no exact match in the store.
#[derive(Debug)]
pub struct MediaInfoCache<E> {
    store: FingerprintStore,
    extractor: E,
    stats: Cell<CacheStats>,
}

impl<E: MetadataExtractor> MediaInfoCache<E> {
    /// Create a cache over an opened store.
    #[must_use]
    pub fn new(store: FingerprintStore, extractor: E) -> Self {
        Self {
            store,
            extractor,
            stats: Cell::new(CacheStats::default()),
        }
    }

    /// Get the metadata of a file, extracting it only if the cache is stale.
    ///
    /// On a miss the freshly extracted output is committed to the store
    /// before the metadata is returned, so an immediate second call for the
    /// same unchanged file is a hit.
    ///
    /// # Errors
    ///
    /// * [`ProcessError::Filesystem`] if the file cannot be stat'ed
    /// * [`ProcessError::Extraction`] if the extractor fails or its output is unreadable
    /// * [`ProcessError::CacheWrite`] if the new entry cannot be committed
    pub fn get_media_info(&self, path: &Path) -> Result<MediaMetadata, ProcessError> {
        let identity =
            FileIdentity::from_path(path).map_err(|source| ProcessError::Filesystem {
                path: path.to_path_buf(),
                source,
            })?;

        match self.store.lookup(&identity) {
            Ok(Some(entry)) => match self.extractor.parse(&entry.metadata) {
                Ok(metadata) => {
                    log::trace!("Media info cache hit: {}", path.display());
                    self.record(|s| s.hits += 1);
                    return Ok(metadata);
                }
                Err(e) => {
                    log::warn!(
                        "Cached media info for {} is unreadable, re-extracting: {}",
                        path.display(),
                        e
                    );
                }
            },
            Ok(None) => log::trace!("Media info cache miss: {}", path.display()),
            Err(e) => {
                log::warn!("Failed to query cache for {}: {}", path.display(), e);
            }
        }

        let extraction_err = |source| ProcessError::Extraction {
            path: path.to_path_buf(),
            source,
        };
        let raw = self.extractor.extract(path).map_err(extraction_err)?;
        let metadata = self.extractor.parse(&raw).map_err(extraction_err)?;

        self.store
            .upsert(&identity, &raw)
            .map_err(|source| ProcessError::CacheWrite {
                path: path.to_path_buf(),
                source,
            })?;
        self.record(|s| s.misses += 1);

        Ok(metadata)
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    /// Counters accumulated since creation.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    /// The extractor used on misses.
    #[must_use]
    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Give back the store, e.g. to close it explicitly.
    #[must_use]
    pub fn into_store(self) -> FingerprintStore {
        self.store
    }
}
