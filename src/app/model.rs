//! Application model: `App` and the input modes the TUI switches between.
//!
//! The `App` struct owns the catalog and the playback engine, and keeps the
//! view state (selection, search, sort, notices) the UI renders from.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::audio::spectrum::BIN_COUNT;
use crate::audio::{
    BAND_COUNT, EngineEvent, MediaOutput, PlaybackEngine, Preset, RodioOutput, TransportCmd,
};
use crate::library::{SortKey, Track, TrackCatalog, TrackIds, truncate_name};
use crate::session::SessionStats;

/// How long a notice stays in the footer.
pub const NOTICE_TTL: Duration = Duration::from_secs(4);

/// What keystrokes currently mean.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing into the search query.
    Search,
    /// Typing a file or directory path to add.
    AddPath(String),
    /// Waiting for `y` before clearing the playlist.
    ConfirmClear,
    /// Keys drive the equalizer panel.
    Equalizer,
}

#[derive(Clone, Debug)]
struct Notice {
    text: String,
    until: Instant,
}

/// The main application model.
pub struct App<O: MediaOutput = RodioOutput> {
    pub catalog: TrackCatalog,
    pub engine: PlaybackEngine<O>,
    pub session: SessionStats,
    pub ids: TrackIds,

    /// Catalog index under the cursor.
    pub selected: Option<usize>,
    pub query: String,
    pub sort: SortKey,
    pub mode: InputMode,
    /// Band under the cursor in the equalizer panel.
    pub eq_band: usize,

    spectrum: Vec<u8>,
    notice: Option<Notice>,
}

impl<O: MediaOutput> App<O> {
    pub fn new(engine: PlaybackEngine<O>) -> Self {
        Self {
            catalog: TrackCatalog::new(),
            engine,
            session: SessionStats::new(),
            ids: TrackIds::new(),
            selected: None,
            query: String::new(),
            sort: SortKey::default(),
            mode: InputMode::Normal,
            eq_band: 0,
            spectrum: vec![0; BIN_COUNT],
            notice: None,
        }
    }

    /// Catalog indices in display order, after search and sort.
    pub fn view_indices(&self) -> Vec<usize> {
        self.catalog
            .filtered_and_sorted(&self.query, self.sort)
            .indices()
            .to_vec()
    }

    pub fn now_playing(&self) -> Option<&Track> {
        self.engine.current_index().and_then(|i| self.catalog.get(i))
    }

    /// Return the next visible index after `current`, wrapping to the first.
    pub fn next_in_view_from(&self, current: Option<usize>) -> Option<usize> {
        let display = self.view_indices();
        if display.is_empty() {
            return None;
        }

        let pos = current.and_then(|c| display.iter().position(|&i| i == c));
        match pos {
            Some(p) => Some(display[(p + 1) % display.len()]),
            None => Some(display[0]),
        }
    }

    /// Return the previous visible index before `current`, wrapping to the last.
    pub fn prev_in_view_from(&self, current: Option<usize>) -> Option<usize> {
        let display = self.view_indices();
        if display.is_empty() {
            return None;
        }

        let pos = current.and_then(|c| display.iter().position(|&i| i == c));
        match pos {
            Some(0) | None => Some(display[display.len() - 1]),
            Some(p) => Some(display[p - 1]),
        }
    }

    pub fn select_next(&mut self) {
        self.selected = self.next_in_view_from(self.selected);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.prev_in_view_from(self.selected);
    }

    pub fn select_first(&mut self) {
        self.selected = self.view_indices().first().copied();
    }

    pub fn select_last(&mut self) {
        self.selected = self.view_indices().last().copied();
    }

    /// Move the cursor onto the first visible track when the current one was
    /// filtered out.
    fn ensure_selected_visible(&mut self) {
        let display = self.view_indices();
        match self.selected {
            Some(i) if display.contains(&i) => {}
            _ => self.selected = display.first().copied(),
        }
    }

    pub fn enter_search(&mut self) {
        self.mode = InputMode::Search;
    }

    /// Leave search mode but keep the query applied.
    pub fn commit_search(&mut self) {
        self.mode = InputMode::Normal;
    }

    pub fn clear_search(&mut self) {
        self.query.clear();
        self.mode = InputMode::Normal;
        self.ensure_selected_visible();
    }

    pub fn push_query_char(&mut self, c: char) {
        self.query.push(c);
        self.ensure_selected_visible();
    }

    pub fn pop_query_char(&mut self) {
        self.query.pop();
        self.ensure_selected_visible();
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.cycle();
        self.set_notice(format!("Sorted by {}", self.sort.label()));
    }

    /// Append an ingested batch. When nothing is loaded yet the first track
    /// of the catalog is loaded so play works right away.
    pub fn add_tracks(&mut self, tracks: Vec<Track>) -> usize {
        let added = tracks.len();
        if added == 0 {
            return 0;
        }
        self.catalog.append(tracks);
        info!(added, total = self.catalog.len(), "tracks added");

        if self.engine.current_index().is_none() {
            self.engine.load_track(&self.catalog, 0);
        }
        if self.selected.is_none() {
            self.ensure_selected_visible();
        }
        added
    }

    /// Remove one track, keeping the engine and the cursor on the same
    /// entries they pointed at.
    pub fn remove_track(&mut self, index: usize) -> Option<Track> {
        let removed = self.catalog.remove(index)?;
        self.engine.track_removed(index);
        self.selected = match self.selected {
            Some(s) if s > index => Some(s - 1),
            Some(s) if s == index => None,
            other => other,
        };
        self.ensure_selected_visible();
        Some(removed)
    }

    pub fn request_clear(&mut self) {
        if !self.catalog.is_empty() {
            self.mode = InputMode::ConfirmClear;
        }
    }

    /// Resolve the pending clear prompt. Returns whether the playlist was
    /// emptied.
    pub fn confirm_clear(&mut self, confirmed: bool) -> bool {
        self.mode = InputMode::Normal;
        let Some(dropped) = self.catalog.clear(|| confirmed) else {
            return false;
        };
        self.engine.stop();
        self.selected = None;
        self.set_notice(format!("Cleared {} tracks", dropped.len()));
        true
    }

    pub fn transport(&mut self, cmd: TransportCmd) {
        self.engine.dispatch(&self.catalog, cmd);
    }

    pub fn play_selected(&mut self) {
        if let Some(i) = self.selected {
            self.transport(TransportCmd::PlayIndex(i));
        }
    }

    /// Advance the engine and return everything it reported since the last
    /// call.
    pub fn tick(&mut self) -> Vec<EngineEvent> {
        self.engine.tick(&self.catalog);
        self.drain_events()
    }

    /// Collect engine events, feeding the session clock and dropping tracks
    /// that failed to load.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut drained = Vec::new();
        loop {
            let events = self.engine.take_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                self.session.observe(&event);
                if let EngineEvent::LoadFailed { index, reason } = &event {
                    self.drop_unplayable(*index, reason);
                }
                drained.push(event);
            }
        }
        drained
    }

    fn drop_unplayable(&mut self, index: usize, reason: &str) {
        if let Some(track) = self.remove_track(index) {
            debug!(index, reason, "dropping unplayable track");
            self.set_notice(format!(
                "Could not play {}, removed from playlist",
                truncate_name(&track.name, 40)
            ));
        }
    }

    pub fn eq_band_left(&mut self) {
        self.eq_band = self.eq_band.checked_sub(1).unwrap_or(BAND_COUNT - 1);
    }

    pub fn eq_band_right(&mut self) {
        self.eq_band = (self.eq_band + 1) % BAND_COUNT;
    }

    /// Nudge the band under the cursor. The equalizer exists only once
    /// playback has started.
    pub fn adjust_eq(&mut self, delta_db: f32) {
        let band = self.eq_band;
        match self.engine.equalizer_mut() {
            Some(eq) => {
                if let Err(e) = eq.adjust_band(band, delta_db) {
                    debug!(error = %e, "equalizer adjustment rejected");
                }
            }
            None => self.set_notice("Start playback to use the equalizer"),
        }
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        match self.engine.equalizer_mut() {
            Some(eq) => {
                eq.apply_preset(preset);
                self.set_notice(format!("Preset: {}", preset.name()));
            }
            None => self.set_notice("Start playback to use the equalizer"),
        }
    }

    /// Pull the latest analyser frame, if the graph exists.
    pub fn refresh_spectrum(&mut self) {
        if let Some(feed) = self.engine.visualizer_mut() {
            let bins = feed.latest_spectrum();
            self.spectrum.clear();
            self.spectrum.extend_from_slice(bins);
        }
    }

    pub fn spectrum(&self) -> &[u8] {
        &self.spectrum
    }

    pub fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            until: Instant::now() + NOTICE_TTL,
        });
    }

    /// The notice still showing at `now`.
    pub fn notice_at(&self, now: Instant) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|n| now < n.until)
            .map(|n| n.text.as_str())
    }

    pub fn expire_notice(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|n| now >= n.until) {
            self.notice = None;
        }
    }
}
