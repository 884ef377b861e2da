//! Listening statistics for the current run.

use std::time::Duration;

use crate::audio::EngineEvent;

/// Tracks played to completion and seconds spent playing.
///
/// The listening clock runs between `Started` and the next `Paused`,
/// `Unloaded` or load; the runtime calls `tick_second` once per second.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    tracks_played: u32,
    listening_secs: u64,
    timing: bool,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::Started => self.timing = true,
            EngineEvent::Paused
            | EngineEvent::TrackLoaded { .. }
            | EngineEvent::Unloaded
            | EngineEvent::LoadFailed { .. }
            | EngineEvent::PlaylistFinished => self.timing = false,
            EngineEvent::TrackEnded { .. } => self.tracks_played += 1,
            _ => {}
        }
    }

    pub fn tick_second(&mut self) {
        if self.timing {
            self.listening_secs += 1;
        }
    }

    pub fn is_timing(&self) -> bool {
        self.timing
    }

    pub fn tracks_played(&self) -> u32 {
        self.tracks_played
    }

    pub fn listening_time(&self) -> Duration {
        Duration::from_secs(self.listening_secs)
    }

    /// `"{m}m {s}s"`, minutes uncapped.
    pub fn listening_label(&self) -> String {
        format!("{}m {}s", self.listening_secs / 60, self.listening_secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_runs_only_while_playing() {
        let mut s = SessionStats::new();
        s.tick_second();
        assert_eq!(s.listening_time(), Duration::ZERO);

        s.observe(&EngineEvent::Started);
        for _ in 0..75 {
            s.tick_second();
        }
        s.observe(&EngineEvent::Paused);
        s.tick_second();

        assert_eq!(s.listening_time(), Duration::from_secs(75));
        assert_eq!(s.listening_label(), "1m 15s");
        assert!(!s.is_timing());
    }

    #[test]
    fn ended_tracks_are_counted() {
        let mut s = SessionStats::new();
        s.observe(&EngineEvent::TrackEnded { index: 0 });
        s.observe(&EngineEvent::TrackEnded { index: 0 });
        s.observe(&EngineEvent::TrackLoaded { index: 1 });
        assert_eq!(s.tracks_played(), 2);
    }

    #[test]
    fn loading_another_track_stops_the_clock_until_started() {
        let mut s = SessionStats::new();
        s.observe(&EngineEvent::Started);
        s.tick_second();
        s.observe(&EngineEvent::TrackLoaded { index: 1 });
        s.tick_second();
        assert_eq!(s.listening_time(), Duration::from_secs(1));

        s.observe(&EngineEvent::Started);
        s.tick_second();
        assert_eq!(s.listening_time(), Duration::from_secs(2));
    }

    #[test]
    fn end_of_playlist_stops_the_clock() {
        let mut s = SessionStats::new();
        s.observe(&EngineEvent::Started);
        s.observe(&EngineEvent::PlaylistFinished);
        s.tick_second();
        assert_eq!(s.listening_label(), "0m 0s");
    }
}
