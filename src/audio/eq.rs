//! Ten-band peaking equalizer.
//!
//! `EqualizerGraph` is the control side: band gains, presets, the active
//! preset label. The gains are published to the audio thread through
//! `SharedGains`, which `EqualizedSource` polls once per frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{PlayerError, Result};

pub const BAND_COUNT: usize = 10;

/// Centre frequencies of the bands, in Hz.
pub const BAND_FREQUENCIES: [f32; BAND_COUNT] = [
    60.0, 170.0, 310.0, 600.0, 1000.0, 3000.0, 6000.0, 12000.0, 14000.0, 16000.0,
];

pub const MIN_GAIN_DB: f32 = -12.0;
pub const MAX_GAIN_DB: f32 = 12.0;

const BAND_Q: f32 = 1.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Preset {
    Flat,
    Pop,
    Rock,
    Jazz,
    Classical,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Flat,
        Preset::Pop,
        Preset::Rock,
        Preset::Jazz,
        Preset::Classical,
    ];

    pub fn gains(self) -> [f32; BAND_COUNT] {
        match self {
            Preset::Flat => [0.0; BAND_COUNT],
            Preset::Pop => [1.0, 3.0, 5.0, 4.0, 2.0, 0.0, -1.0, -1.0, 1.0, 2.0],
            Preset::Rock => [5.0, 3.0, 1.0, 0.0, -1.0, 1.0, 3.0, 4.0, 5.0, 5.0],
            Preset::Jazz => [4.0, 3.0, 1.0, 2.0, -1.0, -1.0, 0.0, 2.0, 3.0, 4.0],
            Preset::Classical => [5.0, 4.0, 3.0, 2.0, -1.0, -1.0, 0.0, 2.0, 3.0, 4.0],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Preset::Flat => "flat",
            Preset::Pop => "pop",
            Preset::Rock => "rock",
            Preset::Jazz => "jazz",
            Preset::Classical => "classical",
        }
    }
}

/// What the preset selector shows.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActivePreset {
    Named(Preset),
    Custom,
}

impl ActivePreset {
    pub fn label(self) -> &'static str {
        match self {
            ActivePreset::Named(p) => p.name(),
            ActivePreset::Custom => "custom",
        }
    }
}

/// Gains handed over to the audio thread. `generation` changes on every
/// publish so the reader only takes the lock when something moved.
#[derive(Debug, Default)]
pub(crate) struct SharedGains {
    gains: Mutex<[f32; BAND_COUNT]>,
    generation: AtomicU64,
}

impl SharedGains {
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn snapshot(&self) -> Option<[f32; BAND_COUNT]> {
        self.gains.lock().ok().map(|g| *g)
    }

    fn publish(&self, gains: [f32; BAND_COUNT]) {
        if let Ok(mut g) = self.gains.lock() {
            *g = gains;
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

#[derive(Debug)]
pub struct EqualizerGraph {
    gains: [f32; BAND_COUNT],
    active: ActivePreset,
    shared: Arc<SharedGains>,
}

impl Default for EqualizerGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl EqualizerGraph {
    /// A flat equalizer.
    pub fn new() -> Self {
        Self {
            gains: [0.0; BAND_COUNT],
            active: ActivePreset::Named(Preset::Flat),
            shared: Arc::new(SharedGains::default()),
        }
    }

    /// Set one band's gain, clamped to `[-12, 12]` dB. Any manual change that
    /// leaves the gains off the active preset's table marks the EQ custom.
    pub fn set_band_gain(&mut self, band: usize, gain_db: f32) -> Result<f32> {
        if band >= BAND_COUNT {
            return Err(PlayerError::BandOutOfRange(band));
        }
        let gain = if gain_db.is_finite() {
            gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB)
        } else {
            0.0
        };
        self.gains[band] = gain;

        if let ActivePreset::Named(p) = self.active {
            if p.gains() != self.gains {
                self.active = ActivePreset::Custom;
            }
        }
        self.shared.publish(self.gains);
        debug!(band, gain, "eq band changed");
        Ok(gain)
    }

    /// Nudge a band by `delta_db`, returning the new gain.
    pub fn adjust_band(&mut self, band: usize, delta_db: f32) -> Result<f32> {
        let current = *self
            .gains
            .get(band)
            .ok_or(PlayerError::BandOutOfRange(band))?;
        self.set_band_gain(band, current + delta_db)
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        self.gains = preset.gains();
        self.active = ActivePreset::Named(preset);
        self.shared.publish(self.gains);
        debug!(preset = preset.name(), "eq preset applied");
    }

    pub fn current_gains(&self) -> [f32; BAND_COUNT] {
        self.gains
    }

    pub fn active_preset(&self) -> ActivePreset {
        self.active
    }

    pub(crate) fn shared(&self) -> Arc<SharedGains> {
        Arc::clone(&self.shared)
    }
}

/// Normalised biquad coefficients (`a0 == 1`).
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct BiquadCoeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoeffs {
    pub(crate) const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// RBJ cookbook peaking filter.
    pub(crate) fn peaking(sample_rate: f32, frequency: f32, q: f32, gain_db: f32) -> Self {
        if sample_rate < 1.0 || gain_db == 0.0 {
            return Self::IDENTITY;
        }
        let a = 10.0_f32.powf(gain_db / 40.0);
        // keep the upper bands stable at low sample rates
        let freq = frequency.min(sample_rate * 0.45);
        let omega = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * q);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_omega) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_omega) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }

    pub(crate) fn for_gains(sample_rate: u32, gains: &[f32; BAND_COUNT]) -> [Self; BAND_COUNT] {
        let mut out = [Self::IDENTITY; BAND_COUNT];
        for ((c, &freq), &gain) in out.iter_mut().zip(BAND_FREQUENCIES.iter()).zip(gains) {
            *c = Self::peaking(sample_rate as f32, freq, BAND_Q, gain);
        }
        out
    }
}

/// Per-channel filter memory.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    #[inline]
    pub(crate) fn process(&mut self, c: &BiquadCoeffs, x: f32) -> f32 {
        let mut y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        if y.abs() < 1e-15 {
            y = 0.0;
        }
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}
