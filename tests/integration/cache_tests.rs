use super::support::{write_media, FakeProbe, AAC_MOVIE, DTS_MOVIE};
use filetime::FileTime;
use media_fixer::cache::{CacheError, FileIdentity, FingerprintStore, MediaInfoCache};
use media_fixer::error::ProcessError;
use media_fixer::media::{Track, TrackKind};
use std::fs;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_unchanged_file_extracted_once() {
    let dir = tempdir().unwrap();
    let movie = write_media(dir.path(), "a.mkv", DTS_MOVIE);

    let probe = FakeProbe::new();
    let cache = MediaInfoCache::new(FingerprintStore::open_in_memory().unwrap(), probe.clone());

    let first = cache.get_media_info(&movie).unwrap();
    let second = cache.get_media_info(&movie).unwrap();

    assert_eq!(first, second);
    assert_eq!(probe.calls(), 1);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 1);
    assert_eq!(
        first.tracks,
        vec![Track::video("h264"), Track::new(TrackKind::Audio, "DTS")]
    );
}

#[test]
fn test_mtime_change_invalidates_entry() {
    let dir = tempdir().unwrap();
    let movie = write_media(dir.path(), "a.mkv", DTS_MOVIE);

    let probe = FakeProbe::new();
    let cache = MediaInfoCache::new(FingerprintStore::open_in_memory().unwrap(), probe.clone());
    cache.get_media_info(&movie).unwrap();

    filetime::set_file_mtime(&movie, FileTime::from_unix_time(1_000_000_000, 0)).unwrap();
    cache.get_media_info(&movie).unwrap();
    assert_eq!(probe.calls(), 2);

    // The row now carries the new identity, so the next call is a hit
    cache.get_media_info(&movie).unwrap();
    assert_eq!(probe.calls(), 2);

    let identity = FileIdentity::from_path(&movie).unwrap();
    let row = cache.store().entry(&movie).unwrap().unwrap();
    assert!(row.matches(&identity));
    assert_eq!(cache.store().len().unwrap(), 1);
}

#[test]
fn test_size_change_invalidates_entry() {
    let dir = tempdir().unwrap();
    let movie = write_media(dir.path(), "a.mkv", DTS_MOVIE);
    let original_mtime = FileTime::from_last_modification_time(&fs::metadata(&movie).unwrap());

    let probe = FakeProbe::new();
    let cache = MediaInfoCache::new(FingerprintStore::open_in_memory().unwrap(), probe.clone());
    assert!(cache
        .get_media_info(&movie)
        .unwrap()
        .tracks
        .contains(&Track::audio("DTS")));

    // Same mtime, different content and size
    fs::write(&movie, "video:h264\naudio:AAC\naudio:AAC\n").unwrap();
    filetime::set_file_mtime(&movie, original_mtime).unwrap();

    let refreshed = cache.get_media_info(&movie).unwrap();
    assert_eq!(probe.calls(), 2);
    assert!(!refreshed.tracks.contains(&Track::audio("DTS")));
}

#[test]
fn test_entries_survive_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("state").join("media.db");
    let movie = write_media(dir.path(), "a.mkv", AAC_MOVIE);

    {
        let cache = MediaInfoCache::new(FingerprintStore::open(&db).unwrap(), FakeProbe::new());
        cache.get_media_info(&movie).unwrap();
        cache.into_store().close().unwrap();
    }

    let probe = FakeProbe::new();
    let cache = MediaInfoCache::new(FingerprintStore::open(&db).unwrap(), probe.clone());
    let metadata = cache.get_media_info(&movie).unwrap();

    assert_eq!(probe.calls(), 0);
    assert_eq!(cache.stats().hits, 1);
    assert!(metadata.tracks.contains(&Track::audio("AAC")));
}

#[test]
fn test_unreadable_cached_blob_is_replaced() {
    let dir = tempdir().unwrap();
    let movie = write_media(dir.path(), "a.mkv", DTS_MOVIE);

    let store = FingerprintStore::open_in_memory().unwrap();
    let identity = FileIdentity::from_path(&movie).unwrap();
    store.upsert(&identity, "not a track listing").unwrap();

    let probe = FakeProbe::new();
    let cache = MediaInfoCache::new(store, probe.clone());
    let metadata = cache.get_media_info(&movie).unwrap();

    assert_eq!(probe.calls(), 1);
    assert!(metadata.tracks.contains(&Track::audio("DTS")));
    assert_eq!(
        cache.store().lookup(&identity).unwrap().unwrap().metadata,
        DTS_MOVIE
    );
}

#[test]
fn test_failed_extraction_is_not_cached() {
    let dir = tempdir().unwrap();
    let movie = write_media(dir.path(), "broken.mkv", "corrupt header");

    let probe = FakeProbe::new();
    let cache = MediaInfoCache::new(FingerprintStore::open_in_memory().unwrap(), probe.clone());

    for _ in 0..2 {
        let err = cache.get_media_info(&movie).unwrap_err();
        assert!(matches!(err, ProcessError::Extraction { .. }));
        assert!(err.to_string().contains("broken.mkv"));
    }
    assert_eq!(probe.calls(), 2);
    assert!(cache.store().is_empty().unwrap());
}

#[test]
fn test_missing_file_is_filesystem_error() {
    let dir = tempdir().unwrap();
    let probe = FakeProbe::new();
    let cache = MediaInfoCache::new(FingerprintStore::open_in_memory().unwrap(), probe.clone());

    let err = cache
        .get_media_info(&dir.path().join("gone.mkv"))
        .unwrap_err();
    assert!(matches!(err, ProcessError::Filesystem { .. }));
    assert_eq!(probe.calls(), 0);
}

#[test]
fn test_unwritable_store_is_cache_write_error() {
    let dir = tempdir().unwrap();
    let movie = write_media(dir.path(), "a.mkv", DTS_MOVIE);
    let db_path = dir.path().join("media.db");

    let probe = FakeProbe::new();
    let cache = MediaInfoCache::new(FingerprintStore::open(&db_path).unwrap(), probe.clone());

    // Pull the table out from under the open store
    let other = rusqlite::Connection::open(&db_path).unwrap();
    other.execute_batch("DROP TABLE files").unwrap();
    drop(other);

    let err = cache.get_media_info(&movie).unwrap_err();
    assert!(matches!(err, ProcessError::CacheWrite { .. }));
    assert_eq!(err.kind(), "cache-write");
    assert!(err.to_string().contains("a.mkv"));
    // Extraction ran; only the commit failed
    assert_eq!(probe.calls(), 1);
    assert_eq!(cache.stats().misses, 0);
}

#[test]
fn test_open_corrupted_database() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"not a sqlite database, just some bytes that are long enough")
        .unwrap();
    temp_file.flush().unwrap();

    let res = FingerprintStore::open(temp_file.path());
    assert!(matches!(
        res,
        Err(CacheError::Open { .. }) | Err(CacheError::Sqlite(_))
    ));
}
