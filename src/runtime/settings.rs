use std::path::Path;

use crate::audio::PlayerSettings;
use crate::config;

/// Load and validate settings. Failures fall back to defaults; the reason is
/// printed now (the terminal is still ours) and returned so it can be logged
/// once tracing is up.
pub fn load_settings(config_path: Option<&Path>) -> (config::Settings, Option<String>) {
    let loaded = match config_path {
        Some(path) => config::Settings::load_from(Some(path)),
        None => config::Settings::load(),
    };
    match loaded {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                let warning = format!("invalid config, using defaults: {msg}");
                eprintln!("allegro: {warning}");
                (config::Settings::default(), Some(warning))
            } else {
                (s, None)
            }
        }
        Err(e) => {
            // Config is optional; failures should not prevent the app from starting.
            let warning = format!("failed to load config, using defaults: {e}");
            eprintln!("allegro: {warning}");
            (config::Settings::default(), Some(warning))
        }
    }
}

impl From<&config::PlayerDefaults> for PlayerSettings {
    fn from(d: &config::PlayerDefaults) -> Self {
        Self {
            volume: d.volume,
            shuffle: d.shuffle,
            repeat: d.repeat,
            playback_rate: d.playback_rate,
        }
    }
}
