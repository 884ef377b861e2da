//! Frequency analyser fed from the equalizer output.
//!
//! The audio thread pushes a mono mix of every frame into a `SpectrumTap`.
//! The UI side owns the `VisualizerFeed`, which windows the latest
//! `FFT_SIZE` samples, runs a real FFT and maps smoothed magnitudes onto
//! `0..=255` decibel bytes.

use std::sync::{Arc, Mutex};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use tracing::{debug, trace};

pub const FFT_SIZE: usize = 256;
pub const BIN_COUNT: usize = FFT_SIZE / 2;

const SMOOTHING: f32 = 0.8;
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;
/// Frames buffered on the audio thread before handing a block over.
const PUBLISH_EVERY: usize = FFT_SIZE;

type SampleWindow = Arc<Mutex<Vec<f32>>>;

/// Audio-thread side of the analyser. Cloning gives a fresh local buffer
/// writing into the same window.
#[derive(Debug)]
pub struct SpectrumTap {
    window: SampleWindow,
    pending: Vec<f32>,
}

impl Clone for SpectrumTap {
    fn clone(&self) -> Self {
        Self {
            window: Arc::clone(&self.window),
            pending: Vec::with_capacity(PUBLISH_EVERY),
        }
    }
}

impl SpectrumTap {
    #[inline]
    pub(crate) fn push(&mut self, sample: f32) {
        self.pending.push(sample);
        if self.pending.len() < PUBLISH_EVERY {
            return;
        }
        // never block the audio thread; a skipped block is invisible
        if let Ok(mut window) = self.window.try_lock() {
            let keep = FFT_SIZE.saturating_sub(self.pending.len());
            let drop = window.len().saturating_sub(keep);
            window.drain(..drop);
            let start = self.pending.len().saturating_sub(FFT_SIZE);
            window.extend_from_slice(&self.pending[start..]);
        }
        self.pending.clear();
    }
}

pub struct VisualizerFeed {
    window: SampleWindow,
    fft: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    blackman: Vec<f32>,
    smoothed: Vec<f32>,
    bins: Vec<u8>,
    running: bool,
}

impl Default for VisualizerFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualizerFeed {
    pub fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let spectrum = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();
        Self {
            window: Arc::new(Mutex::new(Vec::with_capacity(FFT_SIZE))),
            fft,
            input: vec![0.0; FFT_SIZE],
            spectrum,
            scratch,
            blackman: (0..FFT_SIZE).map(|i| blackman_value(i, FFT_SIZE)).collect(),
            smoothed: vec![0.0; BIN_COUNT],
            bins: vec![0; BIN_COUNT],
            running: false,
        }
    }

    pub(crate) fn tap(&self) -> SpectrumTap {
        SpectrumTap {
            window: Arc::clone(&self.window),
            pending: Vec::with_capacity(PUBLISH_EVERY),
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            debug!("visualizer started");
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            debug!("visualizer stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The current spectrum: `BIN_COUNT` bytes, low frequencies first.
    /// While stopped the last snapshot is returned unchanged.
    pub fn latest_spectrum(&mut self) -> &[u8] {
        if self.running {
            self.analyse();
        }
        &self.bins
    }

    fn analyse(&mut self) {
        let filled = match self.window.lock() {
            Ok(window) => {
                let n = window.len().min(FFT_SIZE);
                let offset = FFT_SIZE - n;
                self.input[..offset].fill(0.0);
                self.input[offset..].copy_from_slice(&window[window.len() - n..]);
                n
            }
            Err(_) => return,
        };
        if filled == 0 {
            return;
        }

        for (x, w) in self.input.iter_mut().zip(&self.blackman) {
            *x *= *w;
        }
        if let Err(e) = self
            .fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
        {
            trace!(error = %e, "fft failed, keeping previous spectrum");
            return;
        }

        let scale = 1.0 / FFT_SIZE as f32;
        for (k, bin) in self.bins.iter_mut().enumerate() {
            let magnitude = self.spectrum[k].norm() * scale;
            let s = SMOOTHING * self.smoothed[k] + (1.0 - SMOOTHING) * magnitude;
            self.smoothed[k] = s;
            *bin = db_to_byte(s);
        }
    }
}

fn db_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = (db - MIN_DB) * 255.0 / (MAX_DB - MIN_DB);
    scaled.clamp(0.0, 255.0) as u8
}

fn blackman_value(index: usize, len: usize) -> f32 {
    let a = 0.16;
    let a0 = 0.5 * (1.0 - a);
    let a2 = 0.5 * a;
    let x = 2.0 * std::f32::consts::PI * index as f32 / len as f32;
    a0 - 0.5 * x.cos() + a2 * (2.0 * x).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn spectrum_has_fixed_bin_count_and_starts_silent() {
        let mut feed = VisualizerFeed::new();
        feed.start();
        let bins = feed.latest_spectrum();
        assert_eq!(bins.len(), BIN_COUNT);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_shows_up_in_its_bin() {
        let mut feed = VisualizerFeed::new();
        let mut tap = feed.tap();
        // bin 16 of a 256-point FFT at 44.1 kHz
        let freq = 16.0 * 44_100.0 / FFT_SIZE as f32;
        for s in sine(freq, 44_100.0, FFT_SIZE * 4) {
            tap.push(s);
        }
        feed.start();
        for _ in 0..20 {
            feed.latest_spectrum();
        }
        let bins = feed.latest_spectrum().to_vec();
        let peak = bins
            .iter()
            .enumerate()
            .max_by_key(|(_, b)| **b)
            .map(|(i, _)| i)
            .unwrap();
        assert!((15..=17).contains(&peak), "peak at {peak}");
        assert!(bins[16] > bins[100]);
    }

    #[test]
    fn stopped_feed_returns_stale_snapshot() {
        let mut feed = VisualizerFeed::new();
        let mut tap = feed.tap();
        for s in sine(1000.0, 44_100.0, FFT_SIZE) {
            tap.push(s);
        }
        feed.start();
        let before = feed.latest_spectrum().to_vec();
        feed.stop();

        for _ in 0..FFT_SIZE {
            tap.push(0.0);
        }
        assert_eq!(feed.latest_spectrum(), &before[..]);
        assert!(!feed.is_running());
    }

    #[test]
    fn decibel_mapping_clamps_to_byte_range() {
        assert_eq!(db_to_byte(0.0), 0);
        assert_eq!(db_to_byte(1e-9), 0);
        assert_eq!(db_to_byte(1.0), 255);
        let mid = db_to_byte(10f32.powf(-65.0 / 20.0));
        assert!((126..=128).contains(&mid), "mid = {mid}");
    }
}
