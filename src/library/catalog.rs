//! The ordered track list owned by the player, plus its derived stats and
//! the search/sort projection used by the playlist view.

use std::cmp::Ordering;

use tracing::debug;

use super::model::{Track, TrackId};

/// Playlist ordering used by [`TrackCatalog::filtered_and_sorted`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Catalog (arrival) order.
    #[default]
    Default,
    /// Name, ascending.
    Name,
    /// Duration, longest first; unknown durations sort last.
    Duration,
}

impl SortKey {
    pub fn cycle(self) -> Self {
        match self {
            Self::Default => Self::Name,
            Self::Name => Self::Duration,
            Self::Duration => Self::Default,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Name => "name",
            Self::Duration => "duration",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct CatalogStats {
    pub count: usize,
    /// Sum of known durations, in seconds.
    pub total_duration: f64,
}

#[derive(Debug, Default)]
pub struct TrackCatalog {
    tracks: Vec<Track>,
    stats: CatalogStats,
    revision: u64,
}

impl TrackCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Bumped on every mutation; the runtime persists whenever it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Append `new_tracks` in the given order. Empty input is a no-op.
    pub fn append(&mut self, new_tracks: Vec<Track>) {
        if new_tracks.is_empty() {
            return;
        }
        debug!(added = new_tracks.len(), "appending tracks");
        self.tracks.extend(new_tracks);
        self.touch();
    }

    /// Remove every track once `confirm` agrees. Returns the released tracks,
    /// or `None` when the catalog was empty or the caller declined.
    pub fn clear(&mut self, confirm: impl FnOnce() -> bool) -> Option<Vec<Track>> {
        if self.tracks.is_empty() || !confirm() {
            return None;
        }
        let released = std::mem::take(&mut self.tracks);
        debug!(released = released.len(), "catalog cleared");
        self.touch();
        Some(released)
    }

    /// Drop a single track, e.g. one whose resource turned out to be invalid.
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }
        let track = self.tracks.remove(index);
        self.touch();
        Some(track)
    }

    pub fn find(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn stats(&self) -> CatalogStats {
        self.stats
    }

    /// Project the catalog through a case-insensitive substring `query`
    /// (name, artist, album) and `sort`. Never reorders the catalog itself.
    pub fn filtered_and_sorted(&self, query: &str, sort: SortKey) -> TrackView<'_> {
        let query_lower = query.trim().to_lowercase();
        let mut order: Vec<usize> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.matches(&query_lower))
            .map(|(i, _)| i)
            .collect();

        match sort {
            SortKey::Default => {}
            SortKey::Name => order.sort_by(|&a, &b| {
                let (a, b) = (&self.tracks[a].name, &self.tracks[b].name);
                a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
            }),
            SortKey::Duration => order.sort_by(|&a, &b| {
                let (a, b) = (self.tracks[a].known_duration(), self.tracks[b].known_duration());
                b.partial_cmp(&a).unwrap_or(Ordering::Equal)
            }),
        }

        TrackView {
            catalog: self,
            order,
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.stats = CatalogStats {
            count: self.tracks.len(),
            total_duration: self.tracks.iter().map(Track::known_duration).sum(),
        };
    }
}

/// A restartable, finite projection of the catalog.
#[derive(Debug, Clone)]
pub struct TrackView<'a> {
    catalog: &'a TrackCatalog,
    order: Vec<usize>,
}

impl<'a> TrackView<'a> {
    /// Catalog indices in display order.
    pub fn indices(&self) -> &[usize] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate `(catalog_index, track)` pairs; may be called any number of times.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a Track)> + '_ {
        let catalog = self.catalog;
        self.order.iter().map(move |&i| (i, &catalog.tracks[i]))
    }
}
