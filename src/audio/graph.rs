//! The processing chain between the decoder and the output:
//! source -> ten peaking filters -> analyser tap -> output.

use std::sync::Arc;
use std::time::Duration;

use rodio::Source;
use rodio::source::SeekError;

use super::eq::{BAND_COUNT, BiquadCoeffs, BiquadState, EqualizerGraph, SharedGains};
use super::spectrum::{SpectrumTap, VisualizerFeed};

/// Control handles of the graph, owned by the engine once built.
pub struct AudioGraph {
    pub equalizer: EqualizerGraph,
    pub visualizer: VisualizerFeed,
}

impl Default for AudioGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGraph {
    pub fn new() -> Self {
        Self {
            equalizer: EqualizerGraph::new(),
            visualizer: VisualizerFeed::new(),
        }
    }

    pub fn taps(&self) -> GraphTaps {
        GraphTaps {
            gains: self.equalizer.shared(),
            spectrum: self.visualizer.tap(),
        }
    }
}

/// What an output needs to wire a decoded source through the graph.
#[derive(Clone)]
pub struct GraphTaps {
    pub(crate) gains: Arc<SharedGains>,
    pub(crate) spectrum: SpectrumTap,
}

pub struct EqualizedSource<S> {
    inner: S,
    taps: GraphTaps,
    generation: u64,
    sample_rate: u32,
    channels: u16,
    coeffs: [BiquadCoeffs; BAND_COUNT],
    states: Vec<[BiquadState; BAND_COUNT]>,
    channel: usize,
    frame_sum: f32,
}

impl<S> EqualizedSource<S>
where
    S: Source<Item = f32>,
{
    pub fn new(inner: S, taps: GraphTaps) -> Self {
        let mut source = Self {
            inner,
            taps,
            generation: u64::MAX,
            sample_rate: 0,
            channels: 0,
            coeffs: [BiquadCoeffs::IDENTITY; BAND_COUNT],
            states: Vec::new(),
            channel: 0,
            frame_sum: 0.0,
        };
        source.refresh();
        source
    }

    /// Pick up format changes and new gains at a frame boundary.
    fn refresh(&mut self) {
        let channels = self.inner.channels().max(1);
        let sample_rate = self.inner.sample_rate();
        let generation = self.taps.gains.generation();

        if channels != self.channels {
            self.channels = channels;
            self.states = vec![[BiquadState::default(); BAND_COUNT]; channels as usize];
        }
        if sample_rate != self.sample_rate || generation != self.generation {
            self.sample_rate = sample_rate;
            self.generation = generation;
            if let Some(gains) = self.taps.gains.snapshot() {
                self.coeffs = BiquadCoeffs::for_gains(sample_rate, &gains);
            }
        }
    }
}

impl<S> Iterator for EqualizedSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.channel == 0 {
            self.refresh();
        }
        let sample = self.inner.next()?;

        let idx = self.channel.min(self.states.len() - 1);
        let state = &mut self.states[idx];
        let mut y = sample;
        for (c, s) in self.coeffs.iter().zip(state.iter_mut()) {
            y = s.process(c, y);
        }

        self.frame_sum += y;
        self.channel += 1;
        if self.channel >= self.channels as usize {
            self.taps.spectrum.push(self.frame_sum / self.channels as f32);
            self.frame_sum = 0.0;
            self.channel = 0;
        }
        Some(y)
    }
}

impl<S> Source for EqualizedSource<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        self.inner.try_seek(pos)?;
        for state in &mut self.states {
            *state = [BiquadState::default(); BAND_COUNT];
        }
        self.channel = 0;
        self.frame_sum = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::eq::Preset;
    use rodio::buffer::SamplesBuffer;

    fn tone(channels: u16, frames: usize) -> SamplesBuffer {
        let samples: Vec<f32> = (0..frames)
            .flat_map(|i| {
                let v = (i as f32 * 0.05).sin() * 0.5;
                std::iter::repeat_n(v, channels as usize)
            })
            .collect();
        SamplesBuffer::new(channels, 44_100, samples)
    }

    #[test]
    fn flat_graph_passes_audio_through() {
        let graph = AudioGraph::new();
        let expected: Vec<f32> = tone(2, 512).collect();
        let out: Vec<f32> = EqualizedSource::new(tone(2, 512), graph.taps()).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn boosted_graph_changes_the_signal() {
        let mut graph = AudioGraph::new();
        graph.equalizer.apply_preset(Preset::Rock);
        let expected: Vec<f32> = tone(1, 512).collect();
        let out: Vec<f32> = EqualizedSource::new(tone(1, 512), graph.taps()).collect();
        assert_eq!(out.len(), expected.len());
        assert_ne!(out, expected);
    }

    #[test]
    fn source_reports_inner_format() {
        let graph = AudioGraph::new();
        let src = EqualizedSource::new(tone(2, 16), graph.taps());
        assert_eq!(src.channels(), 2);
        assert_eq!(src.sample_rate(), 44_100);
    }
}
