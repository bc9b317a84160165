//! Low Frequency Oscillator for modulation
//!
//! A secondary oscillator producing a scalar modulation value per sample.
//! Never mixed into the audio output; the consumer of the value (filter,
//! pitch, amplitude) lives outside the engine.

use super::{Oscillator, Waveform};

/// Low Frequency Oscillator
///
/// Shares the waveform family and phase-wrap mechanics of [`Oscillator`],
/// evaluated at a low rate and scaled by depth and amplitude.
pub struct Lfo {
    oscillator: Oscillator,
    /// Depth of modulation (0.0 to 1.0)
    depth: f64,
    /// Output amplitude (0.0 to 1.0)
    amplitude: f64,
    enabled: bool,
}

impl Lfo {
    /// Create a new LFO
    pub fn new(sample_rate: f64) -> Self {
        Self {
            oscillator: Oscillator::new(Waveform::Sine, 0.5, sample_rate),
            depth: 1.0,
            amplitude: 1.0,
            enabled: false,
        }
    }

    /// Set LFO frequency in Hz
    pub fn set_frequency(&mut self, hz: f64) {
        self.oscillator.set_frequency(hz.clamp(0.01, 100.0));
    }

    /// Get LFO frequency
    pub fn frequency(&self) -> f64 {
        self.oscillator.frequency()
    }

    /// Set modulation depth (clamped to 0.0-1.0)
    pub fn set_depth(&mut self, depth: f64) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    /// Get modulation depth
    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Set output amplitude (clamped to 0.0-1.0)
    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.amplitude = amplitude.clamp(0.0, 1.0);
    }

    /// Get output amplitude
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Set the LFO waveform
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.oscillator.set_waveform(waveform);
    }

    /// Get the LFO waveform
    pub fn waveform(&self) -> Waveform {
        self.oscillator.waveform()
    }

    /// Enable or disable the LFO
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Check whether the LFO is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Reset phase
    pub fn reset(&mut self) {
        self.oscillator.reset();
    }

    /// Next modulation value: `waveform(phase) · depth · amplitude`.
    ///
    /// Returns `0.0` while disabled; the phase is frozen, not advanced.
    pub fn process(&mut self) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        f64::from(self.oscillator.next_sample()) * self.depth * self.amplitude
    }
}
