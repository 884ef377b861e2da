use std::fmt;
use std::path::{Path, PathBuf};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Session-unique identity of a catalog entry.
///
/// Ids are handed out by [`TrackIds`] and never reused within a session, so
/// ingesting the same file twice yields two distinct entries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

/// Monotonic allocator for [`TrackId`]s.
#[derive(Debug, Default)]
pub struct TrackIds {
    next: u64,
}

impl TrackIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> TrackId {
        let id = TrackId(self.next.max(1));
        self.next = id.0 + 1;
        id
    }
}

/// Opaque reference to a playable audio resource.
///
/// For local files this is the path; it is what gets persisted and what the
/// startup probe checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef(String);

impl ResourceRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.display().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a catalog entry came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackOrigin {
    /// Read from disk this session; tags and cover art were resolved.
    Ingested,
    /// Rebuilt from the persisted snapshot; metadata only.
    Restored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub resource: ResourceRef,
    pub name: String,
    /// Seconds; `None` until the duration is known.
    pub duration: Option<f64>,
    pub artist: String,
    pub album: String,
    /// Embedded picture as a `data:` URI.
    pub cover_art: Option<String>,
    pub origin: TrackOrigin,
}

impl Track {
    /// A track with default artist/album and the name derived from `path`.
    pub fn from_path(id: TrackId, path: &Path) -> Self {
        Self {
            id,
            resource: ResourceRef::from_path(path),
            name: name_from_path(path),
            duration: None,
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            cover_art: None,
            origin: TrackOrigin::Ingested,
        }
    }

    /// Duration in seconds, with unknown durations counted as zero.
    pub fn known_duration(&self) -> f64 {
        self.duration.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0)
    }

    pub(crate) fn matches(&self, query_lower: &str) -> bool {
        query_lower.is_empty()
            || self.name.to_lowercase().contains(query_lower)
            || self.artist.to_lowercase().contains(query_lower)
            || self.album.to_lowercase().contains(query_lower)
    }
}

/// File name without its final extension, e.g. `"01 Intro.mp3"` -> `"01 Intro"`.
pub fn name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}
