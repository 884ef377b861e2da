use tracing::{debug, info, warn};

use crate::audio::PlayerSettings;
use crate::error::StoreError;
use crate::library::{ResourceProbe, ResourceRef, Track, TrackCatalog, TrackIds};

use super::kv::KeyValueStore;
use super::snapshot::{StoredSettings, StoredTrack};

pub const TRACKS_KEY: &str = "tracks";
pub const SETTINGS_KEY: &str = "settings";
pub const RESUME_INDEX_KEY: &str = "resume_index";
pub const RESUME_TIME_KEY: &str = "resume_time";

pub const STALE_TRACKS_NOTICE: &str = "Audio files need to be re-added";

/// What a previous run left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub settings: PlayerSettings,
    pub tracks: Vec<Track>,
    /// Stored track index and position, only when tracks were restored.
    pub resume: Option<(usize, f64)>,
    /// Shown once to the user.
    pub notice: Option<&'static str>,
}

/// Saves and restores the playlist and transport settings. Failures are
/// logged and swallowed; playback never depends on a successful write.
pub struct PersistenceStore {
    store: Box<dyn KeyValueStore>,
}

impl PersistenceStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub(crate) fn raw(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    pub fn save(&mut self, catalog: &TrackCatalog, settings: &PlayerSettings) {
        if let Err(e) = self.try_save(catalog, settings) {
            warn!(error = %e, "failed to save playlist");
        } else {
            debug!(tracks = catalog.len(), "playlist saved");
        }
    }

    /// An empty catalog removes the stored playlist and resume point rather
    /// than writing an empty list.
    fn try_save(&mut self, catalog: &TrackCatalog, settings: &PlayerSettings) -> Result<(), StoreError> {
        if catalog.is_empty() {
            self.clear();
        } else {
            let tracks: Vec<StoredTrack> =
                catalog.tracks().iter().map(StoredTrack::from).collect();
            self.store.set(TRACKS_KEY, serde_json::to_string(&tracks)?)?;
        }
        self.store
            .set(SETTINGS_KEY, serde_json::to_string(&StoredSettings::from(settings))?)?;
        Ok(())
    }

    /// Write just the resume point; `None` is stored as `-1`.
    pub fn save_position(&mut self, index: Option<usize>, time: f64) {
        let index = index.map_or(-1, |i| i as i64);
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        let result = self
            .store
            .set(RESUME_INDEX_KEY, index.to_string())
            .and_then(|()| self.store.set(RESUME_TIME_KEY, time.to_string()));
        if let Err(e) = result {
            warn!(error = %e, "failed to save position");
        }
    }

    /// Forget the stored playlist and resume point. Settings stay.
    pub fn clear(&mut self) {
        for key in [TRACKS_KEY, RESUME_INDEX_KEY, RESUME_TIME_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "failed to clear stored key");
            }
        }
    }

    /// Read back the previous run. The first stored track is probed before
    /// any of them is trusted; if it is gone, or the list cannot be parsed,
    /// the stored playlist and resume point are dropped and a notice is
    /// returned. Settings are restored either way.
    pub fn load(
        &mut self,
        defaults: PlayerSettings,
        probe: &dyn ResourceProbe,
        ids: &mut TrackIds,
    ) -> LoadOutcome {
        let settings = self.load_settings(defaults);
        let mut outcome = LoadOutcome {
            settings,
            tracks: Vec::new(),
            resume: None,
            notice: None,
        };

        let Some(raw) = self.store.get(TRACKS_KEY) else {
            return outcome;
        };
        let stored: Vec<StoredTrack> = match serde_json::from_str(&raw) {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(error = %e, "stored playlist is corrupt, discarding");
                self.clear();
                return outcome;
            }
        };
        let Some(first) = stored.first() else {
            return outcome;
        };

        let first_ref = ResourceRef::new(first.resource_reference.clone());
        if !probe.is_valid(&first_ref) {
            info!(resource = %first_ref, "stored tracks are no longer readable");
            self.clear();
            outcome.notice = Some(STALE_TRACKS_NOTICE);
            return outcome;
        }

        outcome.tracks = stored
            .into_iter()
            .map(|t| t.into_track(ids.allocate()))
            .collect();
        outcome.resume = self.load_position();
        info!(tracks = outcome.tracks.len(), "playlist restored");
        outcome
    }

    fn load_settings(&self, defaults: PlayerSettings) -> PlayerSettings {
        let Some(raw) = self.store.get(SETTINGS_KEY) else {
            return defaults;
        };
        match serde_json::from_str::<StoredSettings>(&raw) {
            Ok(stored) => stored.apply_to(defaults),
            Err(e) => {
                warn!(error = %e, "stored settings are corrupt, using defaults");
                defaults
            }
        }
    }

    fn load_position(&self) -> Option<(usize, f64)> {
        let index: i64 = self.store.get(RESUME_INDEX_KEY)?.trim().parse().ok()?;
        let index = usize::try_from(index).ok()?;
        let time = self
            .store
            .get(RESUME_TIME_KEY)
            .and_then(|t| t.trim().parse::<f64>().ok())
            .unwrap_or(0.0);
        Some((index, time))
    }
}
