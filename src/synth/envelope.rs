//! ADSR envelope generator
//!
//! Attack-Decay-Sustain-Release envelope for amplitude shaping.

/// Envelope stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// ADSR envelope generator
///
/// The state machine advances one sample per `process()` call. While the
/// envelope is disabled, `process()` returns `1.0` without touching the
/// stage or elapsed time, so re-enabling resumes exactly where the envelope
/// left off.
pub struct Envelope {
    sample_rate: f64,

    // Time parameters (in seconds)
    attack: f64,
    decay: f64,
    sustain: f64, // Level (0.0-1.0)
    release: f64,

    enabled: bool,

    // State
    stage: EnvelopeStage,
    value: f64,
    elapsed: f64,
}

impl Envelope {
    /// Create a new envelope with default parameters
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            attack: 0.01,  // 10ms
            decay: 0.1,    // 100ms
            sustain: 0.7,  // 70% level
            release: 0.3,  // 300ms
            enabled: false,
            stage: EnvelopeStage::Idle,
            value: 0.0,
            elapsed: 0.0,
        }
    }

    /// Set attack time in seconds; zero means instantaneous
    pub fn set_attack(&mut self, seconds: f64) {
        self.attack = seconds.max(0.0);
    }

    /// Set decay time in seconds; zero means instantaneous
    pub fn set_decay(&mut self, seconds: f64) {
        self.decay = seconds.max(0.0);
    }

    /// Set sustain level (0.0-1.0)
    pub fn set_sustain(&mut self, level: f64) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    /// Set release time in seconds; zero means instantaneous
    pub fn set_release(&mut self, seconds: f64) {
        self.release = seconds.max(0.0);
    }

    /// Configure all ADSR parameters at once
    pub fn configure(&mut self, attack: f64, decay: f64, sustain: f64, release: f64) {
        self.set_attack(attack);
        self.set_decay(decay);
        self.set_sustain(sustain);
        self.set_release(release);
    }

    /// Get attack time in seconds
    pub fn attack(&self) -> f64 {
        self.attack
    }

    /// Get decay time in seconds
    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Get sustain level
    pub fn sustain(&self) -> f64 {
        self.sustain
    }

    /// Get release time in seconds
    pub fn release_time(&self) -> f64 {
        self.release
    }

    /// Enable or disable the envelope.
    ///
    /// A disabled envelope yields full amplitude and freezes its state; this
    /// is a bypass, not a stage.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Check whether the envelope is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Trigger the envelope (start the attack phase).
    ///
    /// Legal from any stage, including mid-release; the restart produces an
    /// audible value discontinuity rather than any blend.
    pub fn trigger(&mut self) {
        self.stage = EnvelopeStage::Attack;
        self.elapsed = 0.0;
    }

    /// Release the envelope (start the release phase) from any stage
    pub fn release(&mut self) {
        self.stage = EnvelopeStage::Release;
        self.elapsed = 0.0;
    }

    /// Reset envelope to idle
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.value = 0.0;
        self.elapsed = 0.0;
    }

    /// Get current stage
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Check if the envelope is shaping output (not idle)
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    /// Advance one sample and return the amplitude level.
    ///
    /// Returns `1.0` without advancing while disabled. Zero-duration
    /// segments jump to their target value and move to the next stage on the
    /// same call.
    pub fn process(&mut self) -> f64 {
        if !self.enabled {
            return 1.0;
        }

        let dt = 1.0 / self.sample_rate;

        match self.stage {
            EnvelopeStage::Idle => {
                self.value = 0.0;
            }

            EnvelopeStage::Attack => {
                if self.attack <= 0.0 {
                    self.value = 1.0;
                    self.advance_to(EnvelopeStage::Decay);
                } else {
                    self.elapsed += dt;
                    self.value = self.elapsed / self.attack;
                    if self.value >= 1.0 {
                        self.value = 1.0;
                        self.advance_to(EnvelopeStage::Decay);
                    }
                }
            }

            EnvelopeStage::Decay => {
                if self.decay <= 0.0 {
                    self.value = self.sustain;
                    self.advance_to(EnvelopeStage::Sustain);
                } else {
                    self.elapsed += dt;
                    self.value = 1.0 - (1.0 - self.sustain) * (self.elapsed / self.decay);
                    if self.value <= self.sustain {
                        self.value = self.sustain;
                        self.advance_to(EnvelopeStage::Sustain);
                    }
                }
            }

            EnvelopeStage::Sustain => {
                self.value = self.sustain;
            }

            EnvelopeStage::Release => {
                // Ramps from the sustain level regardless of the value at
                // release time; releasing mid-attack jumps, as the state
                // machine defines, rather than blending
                if self.release <= 0.0 {
                    self.value = 0.0;
                    self.advance_to(EnvelopeStage::Idle);
                } else {
                    self.elapsed += dt;
                    self.value = self.sustain * (1.0 - self.elapsed / self.release);
                    if self.value <= 0.0 {
                        self.value = 0.0;
                        self.advance_to(EnvelopeStage::Idle);
                    }
                }
            }
        }

        self.value
    }

    /// Get current level without advancing
    pub fn value(&self) -> f64 {
        self.value
    }

    fn advance_to(&mut self, stage: EnvelopeStage) {
        self.stage = stage;
        self.elapsed = 0.0;
    }
}
