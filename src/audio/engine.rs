//! Playback state machine.
//!
//! `PlaybackEngine` owns the output, the transport settings and the lazily
//! built audio graph. Catalog-dependent calls borrow the catalog; the engine
//! never holds on to it. Everything observable from outside is reported as
//! an `EngineEvent`, drained by the runtime once per loop iteration.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::library::TrackCatalog;

use super::eq::EqualizerGraph;
use super::graph::AudioGraph;
use super::media::MediaOutput;
use super::queue;
use super::spectrum::VisualizerFeed;
use super::types::{EngineEvent, PlaybackStatus, PlayerSettings, TransportCmd};

/// `previous` restarts the current track instead once this much has played.
pub const RESTART_THRESHOLD_SECS: f64 = 3.0;
pub const MIN_RATE: f32 = 0.25;
pub const MAX_RATE: f32 = 4.0;
const UNMUTE_FALLBACK_VOLUME: f32 = 0.8;

pub struct PlaybackEngine<O: MediaOutput> {
    output: O,
    status: PlaybackStatus,
    current_index: Option<usize>,
    settings: PlayerSettings,
    /// Volume to return to on unmute.
    muted_from: Option<f32>,
    graph: Option<AudioGraph>,
    events: Vec<EngineEvent>,
    rng: StdRng,
}

impl<O: MediaOutput> PlaybackEngine<O> {
    pub fn new(output: O, settings: PlayerSettings) -> Self {
        let mut engine = Self {
            output,
            status: PlaybackStatus::Idle,
            current_index: None,
            settings: PlayerSettings::default(),
            muted_from: None,
            graph: None,
            events: Vec::new(),
            rng: StdRng::from_entropy(),
        };
        engine.restore_settings(settings);
        engine.events.clear();
        engine
    }

    /// Replace the shuffle source, for reproducible runs.
    #[cfg(test)]
    pub(crate) fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn settings(&self) -> PlayerSettings {
        self.settings
    }

    pub fn position(&self) -> f64 {
        if self.output.is_loaded() {
            self.output.position()
        } else {
            0.0
        }
    }

    pub fn duration(&self) -> Option<f64> {
        self.output
            .duration()
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    /// The equalizer, once the graph exists.
    pub fn equalizer(&self) -> Option<&EqualizerGraph> {
        self.graph.as_ref().map(|g| &g.equalizer)
    }

    pub fn equalizer_mut(&mut self) -> Option<&mut EqualizerGraph> {
        self.graph.as_mut().map(|g| &mut g.equalizer)
    }

    pub fn visualizer_mut(&mut self) -> Option<&mut VisualizerFeed> {
        self.graph.as_mut().map(|g| &mut g.visualizer)
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    #[cfg(test)]
    pub(crate) fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn up_next(&self, catalog: &TrackCatalog, count: usize) -> Vec<usize> {
        queue::up_next(self.current_index, catalog.len(), count)
    }

    pub fn dispatch(&mut self, catalog: &TrackCatalog, cmd: TransportCmd) {
        debug!(?cmd, "transport command");
        match cmd {
            TransportCmd::Play => self.play(),
            TransportCmd::Pause => self.pause(),
            TransportCmd::TogglePlayPause => self.toggle_play_pause(catalog),
            TransportCmd::PlayIndex(i) => self.play_index(catalog, i),
            TransportCmd::Next => self.play_next(catalog),
            TransportCmd::Previous => self.play_previous(catalog),
            TransportCmd::SeekFraction(f) => self.seek(f),
            TransportCmd::SeekTo(secs) => self.seek_to(secs),
            TransportCmd::SeekBy(delta) => self.seek_by(delta),
            TransportCmd::SetVolume(v) => self.set_volume(v),
            TransportCmd::StepVolume(d) => self.step_volume(d),
            TransportCmd::ToggleMute => self.toggle_mute(),
            TransportCmd::SetRate(r) => self.set_rate(r),
            TransportCmd::StepRate(d) => self.set_rate(self.settings.playback_rate + d),
            TransportCmd::ToggleShuffle => self.toggle_shuffle(),
            TransportCmd::ToggleRepeat => self.toggle_repeat(),
        }
    }

    /// Load the track at `index`, positioned at 0 and not playing.
    /// Returns `false` when the index is out of range or the resource could
    /// not be opened; the latter is reported as `LoadFailed`.
    pub fn load_track(&mut self, catalog: &TrackCatalog, index: usize) -> bool {
        let Some(track) = catalog.get(index) else {
            return false;
        };
        self.stop_visualizer();
        self.current_index = Some(index);

        match self.output.load(&track.resource, track.duration) {
            Ok(()) => {
                self.status = PlaybackStatus::Loaded;
                debug!(index, name = %track.name, "track loaded");
                self.events.push(EngineEvent::TrackLoaded { index });
                true
            }
            Err(e) => {
                warn!(index, error = %e, "failed to load track");
                self.output.unload();
                self.status = PlaybackStatus::Idle;
                self.events.push(EngineEvent::LoadFailed {
                    index,
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    pub fn play(&mut self) {
        match self.status {
            PlaybackStatus::Loaded | PlaybackStatus::Paused => {}
            PlaybackStatus::Idle | PlaybackStatus::Playing => return,
        }
        self.ensure_graph();
        if self.output.has_ended() {
            self.output.set_position(0.0);
        }
        self.output.play();
        self.status = PlaybackStatus::Playing;
        if let Some(g) = self.graph.as_mut() {
            g.visualizer.start();
        }
        self.events.push(EngineEvent::Started);
    }

    pub fn pause(&mut self) {
        if self.status != PlaybackStatus::Playing {
            return;
        }
        self.output.pause();
        self.status = PlaybackStatus::Paused;
        self.stop_visualizer();
        self.events.push(EngineEvent::Paused);
    }

    pub fn toggle_play_pause(&mut self, catalog: &TrackCatalog) {
        match self.status {
            PlaybackStatus::Playing => self.pause(),
            PlaybackStatus::Loaded | PlaybackStatus::Paused => self.play(),
            PlaybackStatus::Idle => {
                if !catalog.is_empty() && self.load_track(catalog, 0) {
                    self.play();
                }
            }
        }
    }

    pub fn play_index(&mut self, catalog: &TrackCatalog, index: usize) {
        if self.load_track(catalog, index) {
            self.play();
        }
    }

    pub fn play_next(&mut self, catalog: &TrackCatalog) {
        let count = catalog.len();
        if count == 0 {
            return;
        }

        let next = if self.settings.shuffle {
            let mut pick = self.rng.gen_range(0..count);
            if count > 1 {
                while Some(pick) == self.current_index {
                    pick = self.rng.gen_range(0..count);
                }
            }
            pick
        } else {
            let next = self.current_index.map_or(0, |i| i + 1);
            if next >= count {
                if self.settings.repeat {
                    0
                } else {
                    debug!("end of playlist");
                    self.pause();
                    self.events.push(EngineEvent::PlaylistFinished);
                    return;
                }
            } else {
                next
            }
        };

        self.play_index(catalog, next);
    }

    pub fn play_previous(&mut self, catalog: &TrackCatalog) {
        let count = catalog.len();
        if count == 0 {
            return;
        }
        if self.status != PlaybackStatus::Idle && self.position() > RESTART_THRESHOLD_SECS {
            self.output.set_position(0.0);
            self.events.push(EngineEvent::Seeked { position: 0.0 });
            return;
        }
        let prev = match self.current_index {
            Some(0) | None => count - 1,
            Some(i) => (i - 1).min(count - 1),
        };
        self.play_index(catalog, prev);
    }

    /// The current track finished on its own.
    pub fn on_ended(&mut self, catalog: &TrackCatalog) {
        let Some(index) = self.current_index else {
            return;
        };
        self.events.push(EngineEvent::TrackEnded { index });

        if self.settings.repeat {
            self.output.set_position(0.0);
            self.output.play();
            self.status = PlaybackStatus::Playing;
            self.events.push(EngineEvent::Seeked { position: 0.0 });
        } else {
            self.play_next(catalog);
        }
    }

    /// Poll the output for end of stream.
    pub fn tick(&mut self, catalog: &TrackCatalog) {
        if self.status == PlaybackStatus::Playing && self.output.has_ended() {
            self.on_ended(catalog);
        }
    }

    /// Seek to `fraction` of the track. Does nothing while the duration is unknown.
    pub fn seek(&mut self, fraction: f64) {
        let Some(duration) = self.duration() else {
            return;
        };
        if !fraction.is_finite() {
            return;
        }
        self.seek_to(fraction.clamp(0.0, 1.0) * duration);
    }

    pub fn seek_to(&mut self, secs: f64) {
        if self.status == PlaybackStatus::Idle || !secs.is_finite() {
            return;
        }
        let mut target = secs.max(0.0);
        if let Some(d) = self.duration() {
            target = target.min(d);
        }
        self.output.set_position(target);
        self.events.push(EngineEvent::Seeked { position: target });
    }

    pub fn seek_by(&mut self, delta: f64) {
        let target = self.position() + delta;
        self.seek_to(target);
    }

    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        if volume > 0.0 {
            self.muted_from = None;
        }
        self.settings.volume = volume;
        self.output.set_volume(volume);
        self.events.push(EngineEvent::SettingsChanged);
    }

    pub fn step_volume(&mut self, delta: f32) {
        self.set_volume(self.settings.volume + delta);
    }

    pub fn toggle_mute(&mut self) {
        if self.settings.volume > 0.0 {
            let previous = self.settings.volume;
            self.set_volume(0.0);
            self.muted_from = Some(previous);
        } else {
            let restore = self.muted_from.take().unwrap_or(UNMUTE_FALLBACK_VOLUME);
            self.set_volume(restore);
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        if !(rate.is_finite() && rate > 0.0) {
            return;
        }
        let rate = rate.clamp(MIN_RATE, MAX_RATE);
        self.settings.playback_rate = rate;
        self.output.set_rate(rate);
        self.events.push(EngineEvent::SettingsChanged);
    }

    pub fn toggle_shuffle(&mut self) {
        self.settings.shuffle = !self.settings.shuffle;
        self.events.push(EngineEvent::SettingsChanged);
    }

    pub fn toggle_repeat(&mut self) {
        self.settings.repeat = !self.settings.repeat;
        self.events.push(EngineEvent::SettingsChanged);
    }

    /// Apply persisted settings wholesale.
    pub fn restore_settings(&mut self, settings: PlayerSettings) {
        self.settings.shuffle = settings.shuffle;
        self.settings.repeat = settings.repeat;
        self.set_volume(settings.volume);
        self.set_rate(settings.playback_rate);
    }

    /// Load `index` and move to `time` without starting playback. An index
    /// outside the catalog is ignored.
    pub fn resume(&mut self, catalog: &TrackCatalog, index: usize, time: f64) -> bool {
        if index >= catalog.len() {
            debug!(index, len = catalog.len(), "ignoring stale resume index");
            return false;
        }
        if !self.load_track(catalog, index) {
            return false;
        }
        let mut at = if time.is_finite() { time.max(0.0) } else { 0.0 };
        let known = self
            .duration()
            .or_else(|| catalog.get(index).and_then(|t| t.duration))
            .filter(|d| d.is_finite() && *d > 0.0);
        if let Some(d) = known {
            at = at.min(d);
        }
        if at > 0.0 {
            self.output.set_position(at);
        }
        info!(index, at, "resumed");
        true
    }

    /// Keep `current_index` pointing at the same track after the catalog
    /// removed the entry at `removed`.
    pub fn track_removed(&mut self, removed: usize) {
        match self.current_index {
            Some(i) if i == removed => self.stop(),
            Some(i) if i > removed => self.current_index = Some(i - 1),
            _ => {}
        }
    }

    /// Drop the loaded track entirely.
    pub fn stop(&mut self) {
        self.stop_visualizer();
        self.output.unload();
        self.status = PlaybackStatus::Idle;
        self.current_index = None;
        self.events.push(EngineEvent::Unloaded);
    }

    fn ensure_graph(&mut self) {
        if self.graph.is_some() {
            return;
        }
        let graph = AudioGraph::new();
        self.output.attach_graph(graph.taps());
        self.graph = Some(graph);
        info!("audio graph initialised");
    }

    fn stop_visualizer(&mut self) {
        if let Some(g) = self.graph.as_mut() {
            g.visualizer.stop();
        }
    }
}
