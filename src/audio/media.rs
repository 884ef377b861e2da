use crate::error::Result;
use crate::library::ResourceRef;

use super::graph::GraphTaps;

/// The media element the engine drives: one loaded resource, a transport
/// and a position clock. Implementations own the actual audio device.
pub trait MediaOutput {
    /// Replace the current resource. The new one starts paused at 0.
    fn load(&mut self, resource: &ResourceRef, duration_hint: Option<f64>) -> Result<()>;
    fn unload(&mut self);
    fn is_loaded(&self) -> bool;

    /// Route every source through the graph from now on. Called once.
    fn attach_graph(&mut self, taps: GraphTaps);

    fn play(&mut self);
    fn pause(&mut self);

    /// Seconds from the start of the resource.
    fn position(&self) -> f64;
    fn set_position(&mut self, secs: f64);
    /// Total length, when the container says so.
    fn duration(&self) -> Option<f64>;

    fn set_volume(&mut self, volume: f32);
    fn set_rate(&mut self, rate: f32);

    /// Played through to the end since the last `play`.
    fn has_ended(&self) -> bool;
}
