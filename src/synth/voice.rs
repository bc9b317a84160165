//! A single synthesizer voice
//!
//! One independently configured tone generator: an oscillator plus its ADSR
//! envelope, LFO, and filter parameter set.

use super::{Envelope, EnvelopeStage, FilterParams, Lfo, Oscillator, Waveform};

/// Capability surface a voice exposes to its owner.
///
/// All setters are partial updates with optional parameters; none return a
/// value, and in-range inputs never fail.
pub trait VoiceControl {
    /// Enable or bypass the amplitude envelope
    fn enable_adsr(&mut self, enabled: bool);

    /// Update any subset of the ADSR parameters
    fn set_adsr(
        &mut self,
        attack: Option<f64>,
        decay: Option<f64>,
        sustain: Option<f64>,
        release: Option<f64>,
    );

    /// Enable or disable the modulation LFO
    fn enable_lfo(&mut self, enabled: bool);

    /// Update any subset of the LFO parameters
    fn set_lfo(&mut self, frequency: Option<f64>, amplitude: Option<f64>);

    /// Set the filter cutoff in Hz
    fn set_filter_cutoff(&mut self, hz: f64);

    /// Set the filter resonance
    fn set_filter_resonance(&mut self, resonance: f64);
}

/// One voice of the synthesizer
pub struct Voice {
    enabled: bool,
    volume: f64,
    frequency: f64,
    detune_cents: f64,
    oscillator: Oscillator,
    envelope: Envelope,
    lfo: Lfo,
    filter: FilterParams,
    modulation: f64,
}

impl Voice {
    /// Create a voice with the given waveform and base frequency
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Self {
            enabled: false,
            volume: 0.7,
            frequency,
            detune_cents: 0.0,
            oscillator: Oscillator::new(waveform, frequency, sample_rate),
            envelope: Envelope::new(sample_rate),
            lfo: Lfo::new(sample_rate),
            filter: FilterParams::new(),
            modulation: 0.0,
        }
    }

    /// Enable or disable the voice.
    ///
    /// Enabling triggers the envelope; disabling routes it into its release
    /// tail instead of silencing it outright.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.envelope.trigger();
        } else if !enabled && self.enabled {
            self.signal_release();
        }
        self.enabled = enabled;
    }

    /// Check whether the voice is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set the voice volume (clamped to 0.0-1.0)
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Get the voice volume
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Set the base frequency in Hz
    pub fn set_frequency(&mut self, hz: f64) {
        self.frequency = hz;
        self.sync_oscillator();
    }

    /// Get the base frequency
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Set the detune in cents
    pub fn set_detune_cents(&mut self, cents: f64) {
        self.detune_cents = cents;
        self.sync_oscillator();
    }

    /// Get the detune in cents
    pub fn detune_cents(&self) -> f64 {
        self.detune_cents
    }

    /// Set the waveform
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.oscillator.set_waveform(waveform);
    }

    /// Get the waveform
    pub fn waveform(&self) -> Waveform {
        self.oscillator.waveform()
    }

    /// The underlying oscillator
    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }

    /// The amplitude envelope
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// The modulation LFO
    pub fn lfo(&self) -> &Lfo {
        &self.lfo
    }

    /// The filter parameter set
    pub fn filter(&self) -> &FilterParams {
        &self.filter
    }

    /// Enable or disable the downstream filter stage
    pub fn enable_filter(&mut self, enabled: bool) {
        self.filter.set_enabled(enabled);
    }

    /// Latest LFO modulation value, for the downstream consumer
    pub fn modulation(&self) -> f64 {
        self.modulation
    }

    /// Whether the voice should be mixed this sample: enabled, or disabled
    /// with its envelope still shaping a release tail
    pub fn is_audible(&self) -> bool {
        self.enabled || (self.envelope.is_enabled() && self.envelope.is_active())
    }

    /// Route the envelope into release unless it is already releasing or
    /// idle. Re-entering release every sample would restart the ramp and the
    /// tail would never finish.
    pub fn signal_release(&mut self) {
        if matches!(
            self.envelope.stage(),
            EnvelopeStage::Attack | EnvelopeStage::Decay | EnvelopeStage::Sustain
        ) {
            self.envelope.release();
        }
    }

    /// Generate the next sample for this voice, advancing the envelope and
    /// LFO alongside the oscillator.
    pub fn next_sample(&mut self) -> f64 {
        let level = self.envelope.process();
        self.modulation = self.lfo.process();
        f64::from(self.oscillator.next_sample()) * level * self.volume
    }

    /// Push the cents-detuned frequency down to the oscillator.
    ///
    /// The oscillator detune is a raw Hz offset combined additively, so the
    /// exponential cents ratio is expressed as
    /// `frequency · (2^(cents/1200) − 1)`.
    fn sync_oscillator(&mut self) {
        let ratio = (self.detune_cents / 1200.0).exp2();
        self.oscillator.set_frequency(self.frequency);
        self.oscillator.set_detune(self.frequency * (ratio - 1.0));
    }
}

impl VoiceControl for Voice {
    fn enable_adsr(&mut self, enabled: bool) {
        self.envelope.set_enabled(enabled);
    }

    fn set_adsr(
        &mut self,
        attack: Option<f64>,
        decay: Option<f64>,
        sustain: Option<f64>,
        release: Option<f64>,
    ) {
        if let Some(attack) = attack {
            self.envelope.set_attack(attack);
        }
        if let Some(decay) = decay {
            self.envelope.set_decay(decay);
        }
        if let Some(sustain) = sustain {
            self.envelope.set_sustain(sustain);
        }
        if let Some(release) = release {
            self.envelope.set_release(release);
        }
    }

    fn enable_lfo(&mut self, enabled: bool) {
        self.lfo.set_enabled(enabled);
    }

    fn set_lfo(&mut self, frequency: Option<f64>, amplitude: Option<f64>) {
        if let Some(frequency) = frequency {
            self.lfo.set_frequency(frequency);
        }
        if let Some(amplitude) = amplitude {
            self.lfo.set_amplitude(amplitude);
        }
    }

    fn set_filter_cutoff(&mut self, hz: f64) {
        self.filter.set_cutoff(hz);
    }

    fn set_filter_resonance(&mut self, resonance: f64) {
        self.filter.set_resonance(resonance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn test_voice_creation() {
        let voice = Voice::new(Waveform::Sine, 220.0, 44100.0);
        assert!(!voice.is_enabled());
        assert_eq!(voice.frequency(), 220.0);
        assert_eq!(voice.detune_cents(), 0.0);
        assert_eq!(voice.waveform(), Waveform::Sine);
    }

    #[test]
    fn test_cents_detune_conversion() {
        let mut voice = Voice::new(Waveform::Sine, 440.0, 44100.0);
        voice.set_detune_cents(1200.0); // one octave up

        // frequency + detune_hz must equal frequency * 2^(cents/1200)
        let osc = voice.oscillator();
        let effective = osc.frequency() + osc.detune();
        assert!((effective - 880.0).abs() < 1e-9);
        assert_eq!(osc.phase_increment(), TAU * effective / 44100.0);
    }

    #[test]
    fn test_small_cents_detune() {
        let mut voice = Voice::new(Waveform::Saw, 440.0, 44100.0);
        voice.set_detune_cents(50.0);

        let osc = voice.oscillator();
        let expected = 440.0 * (50.0f64 / 1200.0).exp2();
        assert!((osc.frequency() + osc.detune() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_detune_survives_frequency_change() {
        let mut voice = Voice::new(Waveform::Saw, 440.0, 44100.0);
        voice.set_detune_cents(-25.0);
        voice.set_frequency(220.0);

        let osc = voice.oscillator();
        let expected = 220.0 * (-25.0f64 / 1200.0).exp2();
        assert!((osc.frequency() + osc.detune() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_enable_triggers_envelope() {
        let mut voice = Voice::new(Waveform::Sine, 220.0, 44100.0);
        voice.enable_adsr(true);

        voice.set_enabled(true);
        assert_eq!(voice.envelope().stage(), EnvelopeStage::Attack);
    }

    #[test]
    fn test_disable_routes_through_release() {
        let mut voice = Voice::new(Waveform::Sine, 220.0, 44100.0);
        voice.enable_adsr(true);
        voice.set_adsr(Some(0.001), Some(0.001), Some(0.8), Some(0.5));

        voice.set_enabled(true);
        for _ in 0..500 {
            voice.next_sample();
        }

        voice.set_enabled(false);
        assert_eq!(voice.envelope().stage(), EnvelopeStage::Release);
        assert!(voice.is_audible(), "Release tail should keep the voice audible");
    }

    #[test]
    fn test_signal_release_does_not_restart_tail() {
        let mut voice = Voice::new(Waveform::Sine, 220.0, 44100.0);
        voice.enable_adsr(true);
        voice.set_adsr(Some(0.001), Some(0.001), Some(0.8), Some(0.1));

        voice.set_enabled(true);
        for _ in 0..500 {
            voice.next_sample();
        }
        voice.set_enabled(false);

        // Repeated release signals while the tail plays must not reset it
        for _ in 0..200 {
            voice.signal_release();
            voice.next_sample();
        }
        let partway = voice.envelope().value();
        assert!(partway < 0.8);

        for _ in 0..10_000 {
            voice.signal_release();
            voice.next_sample();
        }
        assert_eq!(voice.envelope().stage(), EnvelopeStage::Idle);
        assert!(!voice.is_audible());
    }

    #[test]
    fn test_disabled_adsr_voice_silences_immediately() {
        let mut voice = Voice::new(Waveform::Sine, 220.0, 44100.0);
        voice.set_enabled(true);
        assert!(voice.is_audible());

        voice.set_enabled(false);
        assert!(!voice.is_audible());
    }

    #[test]
    fn test_voice_output_scaled_by_volume() {
        let mut voice = Voice::new(Waveform::Square, 220.0, 44100.0);
        voice.set_enabled(true);
        voice.set_volume(0.5);

        let sample = voice.next_sample();
        assert!((sample.abs() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_voice_control_partial_updates() {
        let mut voice = Voice::new(Waveform::Sine, 220.0, 44100.0);
        voice.set_adsr(Some(0.2), None, Some(0.4), None);
        voice.set_lfo(Some(4.0), None);

        assert_eq!(voice.lfo().frequency(), 4.0);
        assert_eq!(voice.lfo().amplitude(), 1.0);

        voice.set_filter_cutoff(500.0);
        voice.set_filter_resonance(0.3);
        voice.enable_filter(true);
        assert_eq!(voice.filter().cutoff(), 500.0);
        assert_eq!(voice.filter().resonance(), 0.3);
        assert!(voice.filter().is_enabled());
    }

    #[test]
    fn test_modulation_value_exposed() {
        let mut voice = Voice::new(Waveform::Sine, 220.0, 44100.0);
        voice.enable_lfo(true);
        voice.set_lfo(Some(2.0), Some(1.0));
        voice.set_enabled(true);

        let mut peak = 0.0f64;
        for _ in 0..44100 {
            voice.next_sample();
            peak = peak.max(voice.modulation().abs());
        }
        assert!(peak > 0.9, "LFO should swing near full scale, got {}", peak);
    }
}
