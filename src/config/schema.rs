use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/allegro/config.toml` or `~/.config/allegro/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `ALLEGRO__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub player: PlayerDefaults,
    pub controls: ControlsSettings,
    pub persistence: PersistenceSettings,
    pub library: LibrarySettings,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
}

/// Transport settings used when nothing was persisted by a previous run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerDefaults {
    /// Initial volume in `[0, 1]`.
    pub volume: f32,
    /// Initial playback rate (1.0 = normal speed).
    pub playback_rate: f32,
    pub shuffle: bool,
    pub repeat: bool,
}

impl Default for PlayerDefaults {
    fn default() -> Self {
        Self {
            volume: 1.0,
            playback_rate: 1.0,
            shuffle: false,
            repeat: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Seconds to jump when pressing `H` / `L`.
    pub seek_seconds: u64,
    /// Volume change per `+` / `-` press.
    pub volume_step: f32,
    /// Gain change per keypress in the equalizer panel (dB).
    pub eq_step_db: f32,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            seek_seconds: 10,
            volume_step: 0.1,
            eq_step_db: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceSettings {
    /// Save and restore the playlist between runs.
    pub enabled: bool,
    /// Override for the state file location.
    pub path: Option<PathBuf>,
    /// Interval for the resume-point autosave.
    pub autosave_secs: u64,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            autosave_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: ["mp3", "flac", "wav", "ogg", "opus", "m4a"]
                .into_iter()
                .map(String::from)
                .collect(),
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
    /// How many tracks the "up next" panel shows.
    pub queue_length: usize,
    /// Whether to draw the spectrum panel.
    pub visualizer: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ allegro ~ ".to_string(),
            queue_length: 5,
            visualizer: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `"info"` or `"allegro=debug"`.
    pub level: String,
    /// Log file; defaults to `$XDG_STATE_HOME/allegro/allegro.log`.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
