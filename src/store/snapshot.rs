//! Serialized forms of catalog entries and transport settings.
//!
//! Field names are camelCase on disk; unknown fields are ignored and missing
//! settings fields keep whatever the caller had.

use serde::{Deserialize, Serialize};

use crate::audio::PlayerSettings;
use crate::library::{ResourceRef, Track, TrackId, TrackOrigin};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTrack {
    pub name: String,
    #[serde(default)]
    pub duration: Option<f64>,
    pub artist: String,
    pub album: String,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub resource_reference: String,
}

impl From<&Track> for StoredTrack {
    fn from(t: &Track) -> Self {
        Self {
            name: t.name.clone(),
            duration: t.duration.filter(|d| d.is_finite()),
            artist: t.artist.clone(),
            album: t.album.clone(),
            cover_art: t.cover_art.clone(),
            resource_reference: t.resource.as_str().to_string(),
        }
    }
}

impl StoredTrack {
    pub fn into_track(self, id: TrackId) -> Track {
        Track {
            id,
            resource: ResourceRef::new(self.resource_reference),
            name: self.name,
            duration: self.duration,
            artist: self.artist,
            album: self.album,
            cover_art: self.cover_art,
            origin: TrackOrigin::Restored,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub is_shuffle: Option<bool>,
    #[serde(default)]
    pub is_repeat: Option<bool>,
    #[serde(default)]
    pub playback_rate: Option<f32>,
}

impl From<&PlayerSettings> for StoredSettings {
    fn from(s: &PlayerSettings) -> Self {
        Self {
            volume: Some(s.volume),
            is_shuffle: Some(s.shuffle),
            is_repeat: Some(s.repeat),
            playback_rate: Some(s.playback_rate),
        }
    }
}

impl StoredSettings {
    /// Overlay the stored fields on `base`.
    pub fn apply_to(self, base: PlayerSettings) -> PlayerSettings {
        PlayerSettings {
            volume: self.volume.unwrap_or(base.volume),
            shuffle: self.is_shuffle.unwrap_or(base.shuffle),
            repeat: self.is_repeat.unwrap_or(base.repeat),
            playback_rate: self
                .playback_rate
                .filter(|r| *r > 0.0)
                .unwrap_or(base.playback_rate),
        }
    }
}
