//! In-memory `MediaOutput` for tests that need no audio device.

use std::collections::HashSet;

use crate::error::{PlayerError, Result};
use crate::library::ResourceRef;

use super::graph::GraphTaps;
use super::media::MediaOutput;

#[derive(Default)]
pub(crate) struct FakeOutput {
    pub(crate) loaded: Option<ResourceRef>,
    pub(crate) duration: Option<f64>,
    pub(crate) position: f64,
    pub(crate) playing: bool,
    pub(crate) ended: bool,
    pub(crate) volume: f32,
    pub(crate) rate: f32,
    pub(crate) attach_count: usize,
    pub(crate) broken: HashSet<String>,
}

impl MediaOutput for FakeOutput {
    fn load(&mut self, resource: &ResourceRef, duration_hint: Option<f64>) -> Result<()> {
        if self.broken.contains(resource.as_str()) {
            return Err(PlayerError::ResourceDecode {
                resource: resource.to_string(),
                reason: "unreadable".into(),
            });
        }
        self.loaded = Some(resource.clone());
        self.duration = duration_hint;
        self.position = 0.0;
        self.playing = false;
        self.ended = false;
        Ok(())
    }

    fn unload(&mut self) {
        self.loaded = None;
        self.duration = None;
        self.position = 0.0;
        self.playing = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn attach_graph(&mut self, _taps: GraphTaps) {
        self.attach_count += 1;
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, secs: f64) {
        self.position = secs;
        self.ended = false;
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    fn has_ended(&self) -> bool {
        self.loaded.is_some() && self.ended
    }
}
