//! Basic oscillator implementation

use std::f64::consts::TAU;

/// Waveform types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Square,
    Saw,
    Triangle,
}

/// A phase-accumulator oscillator that generates waveforms
///
/// Phase is tracked in radians and always wraps into `[0, 2π)`. The phase
/// advance per sample is cached and recomputed whenever frequency, detune,
/// or sample rate change.
pub struct Oscillator {
    waveform: Waveform,
    frequency: f64,
    detune: f64,
    phase: f64,
    phase_increment: f64,
    sample_rate: f64,
}

impl Oscillator {
    /// Create a new oscillator
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        let mut osc = Self {
            waveform,
            frequency,
            detune: 0.0,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate,
        };
        osc.update_increment();
        osc
    }

    /// Set the base frequency in Hz
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
        self.update_increment();
    }

    /// Get the base frequency
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Set the detune offset in Hz, added to the base frequency
    pub fn set_detune(&mut self, detune: f64) {
        self.detune = detune;
        self.update_increment();
    }

    /// Get the detune offset in Hz
    pub fn detune(&self) -> f64 {
        self.detune
    }

    /// Set the waveform
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Get the waveform
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Set the sample rate
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.update_increment();
    }

    /// Current phase angle in radians, in `[0, 2π)`
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Phase advance per sample: `2π·(frequency + detune) / sample_rate`
    pub fn phase_increment(&self) -> f64 {
        self.phase_increment
    }

    /// Reset the phase
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn update_increment(&mut self) {
        self.phase_increment = TAU * (self.frequency + self.detune) / self.sample_rate;
    }

    /// Generate the next sample, then advance and wrap the phase.
    ///
    /// Every call produces exactly one output sample. Callers must call this
    /// once per output sample, never more, never fewer, or the effective
    /// pitch will be wrong.
    pub fn next_sample(&mut self) -> f32 {
        let sample = self.evaluate(self.phase);
        self.phase = (self.phase + self.phase_increment).rem_euclid(TAU);
        sample as f32
    }

    /// Evaluate the waveform at a phase angle in `[0, 2π)`
    fn evaluate(&self, phase: f64) -> f64 {
        let normalized = phase / TAU;
        match self.waveform {
            Waveform::Sine => phase.sin(),
            // Hard edge at the sine zero-crossing; aliasing accepted
            Waveform::Square => {
                if phase.sin() >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => 2.0 * normalized - 1.0,
            Waveform::Triangle => 2.0 * (2.0 * normalized - 1.0).abs() - 1.0,
        }
    }
}
