//! Playlist and settings persistence across runs.

mod kv;
mod persist;
mod snapshot;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use persist::{
    LoadOutcome, PersistenceStore, RESUME_INDEX_KEY, RESUME_TIME_KEY, SETTINGS_KEY,
    STALE_TRACKS_NOTICE, TRACKS_KEY,
};
pub use snapshot::{StoredSettings, StoredTrack};

#[cfg(test)]
mod tests;
