//! Audio-related small types.
//!
//! This module defines the engine's state enum, the persisted transport
//! settings, the transport command set and the events the engine emits.

/// Where the engine is in its lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// No track loaded.
    #[default]
    Idle,
    /// A track is loaded and positioned but has not been started.
    Loaded,
    Playing,
    Paused,
}

/// Transport settings that survive restarts.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlayerSettings {
    /// Output volume in `[0, 1]`.
    pub volume: f32,
    pub shuffle: bool,
    /// When on, a finished track restarts and `next` wraps at the end.
    pub repeat: bool,
    /// Positive speed multiplier.
    pub playback_rate: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            shuffle: false,
            repeat: false,
            playback_rate: 1.0,
        }
    }
}

/// Synchronous transport commands, from keys or the host media controls.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TransportCmd {
    Play,
    Pause,
    TogglePlayPause,
    /// Load and start the track at this catalog index.
    PlayIndex(usize),
    Next,
    Previous,
    /// Seek to a fraction `[0, 1]` of the track.
    SeekFraction(f64),
    /// Seek to an absolute position in seconds.
    SeekTo(f64),
    /// Seek relative to the current position, in seconds.
    SeekBy(f64),
    SetVolume(f32),
    StepVolume(f32),
    ToggleMute,
    SetRate(f32),
    StepRate(f32),
    ToggleShuffle,
    ToggleRepeat,
}

/// Things that happened inside the engine since the last drain.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    TrackLoaded { index: usize },
    LoadFailed { index: usize, reason: String },
    Started,
    Paused,
    /// Position moved without a track change (seek or restart).
    Seeked { position: f64 },
    TrackEnded { index: usize },
    /// Reached the end of the playlist with repeat off.
    PlaylistFinished,
    SettingsChanged,
    Unloaded,
}
