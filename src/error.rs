//! Error types shared across the player.
//!
//! Nothing here is fatal once the terminal is up: callers turn these into
//! notices or log lines and keep the player interactive.

use std::path::PathBuf;

/// Result alias that defaults to [`PlayerError`].
pub type Result<T, E = PlayerError> = std::result::Result<T, E>;

/// Errors raised by the playback engine and its output.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// The resource reference could not be opened (missing file, permissions).
    #[error("cannot open {resource}: {source}")]
    ResourceOpen {
        resource: String,
        #[source]
        source: std::io::Error,
    },
    /// The resource opened but could not be decoded as audio.
    #[error("cannot decode {resource}: {reason}")]
    ResourceDecode { resource: String, reason: String },
    /// Equalizer band index outside `0..10`.
    #[error("equalizer band {0} is out of range")]
    BandOutOfRange(usize),
    /// No audio output device could be opened.
    #[error("no audio output device: {0}")]
    NoOutput(String),
}

/// Errors raised while ingesting files into the catalog.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },
    #[error("{}: not an audio file", .0.display())]
    NotAudio(PathBuf),
}

/// Errors raised by the key/value persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
