use std::path::Path;

use super::*;
use crate::audio::PlayerSettings;
use crate::error::StoreError;
use crate::library::{ResourceProbe, ResourceRef, Track, TrackCatalog, TrackIds, TrackOrigin};

struct Probe(bool);

impl ResourceProbe for Probe {
    fn is_valid(&self, _resource: &ResourceRef) -> bool {
        self.0
    }
}

struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&mut self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("quota exceeded")))
    }

    fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("quota exceeded")))
    }
}

fn sample_catalog() -> TrackCatalog {
    let mut ids = TrackIds::new();
    let mut a = Track::from_path(ids.allocate(), Path::new("/music/a.flac"));
    a.duration = Some(201.5);
    a.artist = "Artist A".into();
    a.album = "Album A".into();
    a.cover_art = Some("data:image/png;base64,AAAA".into());
    let b = Track::from_path(ids.allocate(), Path::new("/music/b.mp3"));

    let mut catalog = TrackCatalog::new();
    catalog.append(vec![a, b]);
    catalog
}

fn settings() -> PlayerSettings {
    PlayerSettings {
        volume: 0.35,
        shuffle: true,
        repeat: true,
        playback_rate: 1.25,
    }
}

fn memory() -> PersistenceStore {
    PersistenceStore::new(Box::new(MemoryStore::new()))
}

#[test]
fn round_trip_restores_identical_metadata() {
    let catalog = sample_catalog();
    let mut store = memory();
    store.save(&catalog, &settings());
    store.save_position(Some(1), 42.5);

    let mut ids = TrackIds::new();
    let out = store.load(PlayerSettings::default(), &Probe(true), &mut ids);

    assert_eq!(out.tracks.len(), 2);
    for (restored, original) in out.tracks.iter().zip(catalog.tracks()) {
        assert_eq!(restored.name, original.name);
        assert_eq!(restored.duration, original.duration);
        assert_eq!(restored.artist, original.artist);
        assert_eq!(restored.album, original.album);
        assert_eq!(restored.cover_art, original.cover_art);
        assert_eq!(restored.resource, original.resource);
        assert_eq!(restored.origin, TrackOrigin::Restored);
    }
    assert_eq!(out.settings, settings());
    assert_eq!(out.resume, Some((1, 42.5)));
    assert!(out.notice.is_none());
}

#[test]
fn probe_failure_empties_catalog_and_drops_position_keys() {
    let mut store = memory();
    store.save(&sample_catalog(), &settings());
    store.save_position(Some(0), 12.0);

    let out = store.load(PlayerSettings::default(), &Probe(false), &mut TrackIds::new());

    assert!(out.tracks.is_empty());
    assert!(out.resume.is_none());
    assert_eq!(out.notice, Some(STALE_TRACKS_NOTICE));
    assert!(store.raw(TRACKS_KEY).is_none());
    assert!(store.raw(RESUME_INDEX_KEY).is_none());
    assert!(store.raw(RESUME_TIME_KEY).is_none());
    // settings carry no resource references and survive
    assert_eq!(out.settings, settings());
    assert!(store.raw(SETTINGS_KEY).is_some());
}

#[test]
fn corrupt_track_list_is_discarded() {
    let mut kv = MemoryStore::new();
    kv.set(TRACKS_KEY, "{not json".into()).unwrap();
    kv.set(RESUME_INDEX_KEY, "0".into()).unwrap();
    let mut store = PersistenceStore::new(Box::new(kv));

    let out = store.load(PlayerSettings::default(), &Probe(true), &mut TrackIds::new());
    assert!(out.tracks.is_empty());
    assert!(store.raw(TRACKS_KEY).is_none());
    assert!(store.raw(RESUME_INDEX_KEY).is_none());
}

#[test]
fn partial_settings_overlay_defaults() {
    let mut kv = MemoryStore::new();
    kv.set(SETTINGS_KEY, r#"{"volume":0.5,"isRepeat":true}"#.into())
        .unwrap();
    let mut store = PersistenceStore::new(Box::new(kv));

    let defaults = PlayerSettings {
        playback_rate: 1.5,
        ..PlayerSettings::default()
    };
    let out = store.load(defaults, &Probe(true), &mut TrackIds::new());
    assert_eq!(out.settings.volume, 0.5);
    assert!(out.settings.repeat);
    assert!(!out.settings.shuffle);
    assert_eq!(out.settings.playback_rate, 1.5);
}

#[test]
fn stored_format_uses_camel_case_fields() {
    let mut store = memory();
    store.save(&sample_catalog(), &settings());

    let tracks: serde_json::Value = serde_json::from_str(&store.raw(TRACKS_KEY).unwrap()).unwrap();
    assert_eq!(tracks[0]["resourceReference"], "/music/a.flac");
    assert_eq!(tracks[0]["coverArt"], "data:image/png;base64,AAAA");
    assert!(tracks[1]["duration"].is_null());

    let s: serde_json::Value = serde_json::from_str(&store.raw(SETTINGS_KEY).unwrap()).unwrap();
    assert_eq!(s["isShuffle"], true);
    assert_eq!(s["playbackRate"], 1.25);
}

#[test]
fn missing_or_negative_resume_index_means_no_resume() {
    let mut store = memory();
    store.save(&sample_catalog(), &settings());
    let out = store.load(PlayerSettings::default(), &Probe(true), &mut TrackIds::new());
    assert!(out.resume.is_none());

    store.save_position(None, 3.0);
    let out = store.load(PlayerSettings::default(), &Probe(true), &mut TrackIds::new());
    assert!(out.resume.is_none());
}

#[test]
fn empty_store_restores_defaults() {
    let mut store = memory();
    let out = store.load(settings(), &Probe(false), &mut TrackIds::new());
    assert!(out.tracks.is_empty());
    assert!(out.notice.is_none());
    assert_eq!(out.settings, settings());
}

#[test]
fn failing_store_is_swallowed() {
    let mut store = PersistenceStore::new(Box::new(FailingStore));
    store.save(&sample_catalog(), &settings());
    store.save_position(Some(0), 1.0);
    store.clear();
    let out = store.load(settings(), &Probe(true), &mut TrackIds::new());
    assert!(out.tracks.is_empty());
}

#[test]
fn clear_keeps_settings() {
    let mut store = memory();
    store.save(&sample_catalog(), &settings());
    store.save_position(Some(1), 5.0);
    store.clear();
    assert!(store.raw(TRACKS_KEY).is_none());
    assert!(store.raw(RESUME_TIME_KEY).is_none());
    assert!(store.raw(SETTINGS_KEY).is_some());
}

#[test]
fn saving_an_empty_catalog_removes_the_snapshot() {
    let mut store = memory();
    store.save(&sample_catalog(), &settings());
    store.save_position(Some(1), 5.0);

    store.save(&TrackCatalog::new(), &settings());
    assert!(store.raw(TRACKS_KEY).is_none());
    assert!(store.raw(RESUME_INDEX_KEY).is_none());
    assert!(store.raw(RESUME_TIME_KEY).is_none());
    assert!(store.raw(SETTINGS_KEY).is_some());
}

#[test]
fn durations_come_back_bit_identical() {
    let durations = [
        114.369_931_496_647_31,
        0.1 + 0.2,
        201.000_000_000_000_03,
        1.0 / 3.0,
        5_999.999_999_999_999,
    ];
    let mut ids = TrackIds::new();
    let mut catalog = TrackCatalog::new();
    catalog.append(
        durations
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                let mut t = Track::from_path(ids.allocate(), Path::new(&format!("/music/{i}.ogg")));
                t.duration = Some(d);
                t
            })
            .collect(),
    );
    let mut store = memory();
    store.save(&catalog, &settings());

    let out = store.load(PlayerSettings::default(), &Probe(true), &mut TrackIds::new());
    let restored: Vec<u64> = out
        .tracks
        .iter()
        .map(|t| t.duration.map_or(0, f64::to_bits))
        .collect();
    let expected: Vec<u64> = durations.iter().map(|d| d.to_bits()).collect();
    assert_eq!(restored, expected);
}

#[test]
fn json_file_store_persists_across_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");

    let mut kv = JsonFileStore::open(&path);
    kv.set("a", "1".into()).unwrap();
    kv.set("b", "two".into()).unwrap();
    kv.remove("a").unwrap();
    assert_eq!(kv.path(), path.as_path());

    let reopened = JsonFileStore::open(&path);
    assert_eq!(reopened.get("a"), None);
    assert_eq!(reopened.get("b").as_deref(), Some("two"));
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn json_file_store_treats_garbage_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "garbage").unwrap();

    let kv = JsonFileStore::open(&path);
    assert_eq!(kv.get("tracks"), None);
}
