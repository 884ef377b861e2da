//! Audio playback: the engine state machine, the output device, and the
//! equalizer/analyser graph between them.

mod engine;
pub mod eq;
#[cfg(test)]
pub(crate) mod fake;
mod graph;
mod media;
mod queue;
mod sink;
pub mod spectrum;
mod types;

pub use engine::PlaybackEngine;
pub use eq::{ActivePreset, BAND_COUNT, BAND_FREQUENCIES, Preset};
pub use media::MediaOutput;
pub use sink::RodioOutput;
pub use types::{EngineEvent, PlaybackStatus, PlayerSettings, TransportCmd};
