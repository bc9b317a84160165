//! Three-voice mixing engine and audio output
//!
//! Owns the voices and the per-sample mixing loop, and feeds blocks of mixed
//! audio to an output stream under queued-bytes backpressure.

mod output;
mod recorder;

pub use output::{default_device_name, list_output_devices, CpalOutput, OutputStream, StreamError};
pub use recorder::Recorder;

use crate::synth::{Voice, VoiceControl, Waveform};
use rand::Rng;

/// Number of voices in the engine
pub const VOICE_COUNT: usize = 3;

/// Partial update for one voice's configuration.
///
/// Only the supplied fields are applied. Supplying `volume` also derives the
/// enabled flag: a voice at zero volume is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoiceUpdate {
    pub enabled: Option<bool>,
    pub frequency: Option<f64>,
    pub waveform: Option<Waveform>,
    pub detune_cents: Option<f64>,
    pub volume: Option<f64>,
}

/// The three-voice synthesizer engine
///
/// Constructed once per session; voices are mutated through setters and the
/// mixed output is produced by [`update`](SynthEngine::update) on the
/// control thread. Nothing here blocks: when the output queue is full
/// enough, an update tick simply does no work.
pub struct SynthEngine {
    voices: [Voice; VOICE_COUNT],
    master_volume: f64,
    block: Vec<f32>,
    sample_rate: f64,
}

impl SynthEngine {
    /// Create an engine with default waveforms per voice
    pub fn new(sample_rate: f64, block_len: usize) -> Self {
        Self {
            voices: [
                Voice::new(Waveform::Sine, 220.0, sample_rate),
                Voice::new(Waveform::Square, 220.0, sample_rate),
                Voice::new(Waveform::Saw, 220.0, sample_rate),
            ],
            master_volume: 0.7,
            block: vec![0.0; block_len],
            sample_rate,
        }
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Get a voice by index
    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// Get a voice mutably by index
    pub fn voice_mut(&mut self, index: usize) -> Option<&mut Voice> {
        self.voices.get_mut(index)
    }

    /// Apply a partial configuration update to a voice.
    ///
    /// An invalid index is silently ignored; configuration calls are
    /// best-effort and never interrupt audio production.
    pub fn set_voice_config(&mut self, index: usize, update: VoiceUpdate) {
        let Some(voice) = self.voices.get_mut(index) else {
            return;
        };

        if let Some(enabled) = update.enabled {
            voice.set_enabled(enabled);
        }
        if let Some(frequency) = update.frequency {
            voice.set_frequency(frequency);
        }
        if let Some(waveform) = update.waveform {
            voice.set_waveform(waveform);
        }
        if let Some(cents) = update.detune_cents {
            voice.set_detune_cents(cents);
        }
        if let Some(volume) = update.volume {
            voice.set_volume(volume);
            voice.set_enabled(volume > 0.0);
        }
    }

    /// Set the master volume (clamped to 0.0-1.0)
    pub fn set_master_volume(&mut self, volume: f64) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    /// Get the master volume
    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    /// Number of enabled voices
    pub fn count_enabled(&self) -> usize {
        self.voices.iter().filter(|v| v.is_enabled()).count()
    }

    /// Whether any voice is still producing output, release tails included
    pub fn has_active_voices(&self) -> bool {
        self.voices.iter().any(|v| v.is_audible())
    }

    /// Randomize every voice's configuration.
    ///
    /// Draw order is fixed, so a seeded RNG reproduces the same patch.
    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        for voice in &mut self.voices {
            let enabled = rng.gen_bool(0.5);
            let frequency = rng.gen_range(20.0..=20000.0);
            let detune_cents = rng.gen_range(-50.0..=50.0);
            let volume = rng.gen_range(0.0..=1.0);
            let waveform = match rng.gen_range(0..4) {
                0 => Waveform::Sine,
                1 => Waveform::Square,
                2 => Waveform::Saw,
                _ => Waveform::Triangle,
            };

            voice.set_frequency(frequency);
            voice.set_detune_cents(detune_cents);
            voice.set_waveform(waveform);
            voice.set_volume(volume);
            voice.set_enabled(enabled);

            let attack = rng.gen_range(0.01..=2.0);
            let decay = rng.gen_range(0.01..=2.0);
            let sustain = rng.gen_range(0.0..=1.0);
            let release = rng.gen_range(0.01..=2.0);
            voice.set_adsr(Some(attack), Some(decay), Some(sustain), Some(release));

            let lfo_frequency = rng.gen_range(1.0..=20.0);
            let lfo_amplitude = rng.gen_range(0.0..=1.0);
            voice.set_lfo(Some(lfo_frequency), Some(lfo_amplitude));

            // Resonance capped below self-oscillation
            voice.set_filter_cutoff(rng.gen_range(200.0..=20000.0));
            voice.set_filter_resonance(rng.gen_range(0.0..=0.8));
        }
    }

    /// Fill a buffer with mixed samples
    pub fn fill_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_mixed_sample() as f32;
        }
    }

    /// One engine tick: generate and enqueue a block, but only when the
    /// output queue has dropped below one block's worth of audio.
    ///
    /// Never blocks; a tick against a full queue does no work.
    pub fn update(&mut self, output: &mut dyn OutputStream) -> Result<(), StreamError> {
        let threshold = self.block.len() * std::mem::size_of::<f32>();
        if output.queued_bytes() >= threshold {
            return Ok(());
        }

        let mut block = std::mem::take(&mut self.block);
        self.fill_block(&mut block);
        let result = output.push(&block);
        self.block = block;
        result
    }

    /// Mix one sample across all voices.
    ///
    /// Disabled voices are routed into their release tails and keep being
    /// mixed until the tail finishes. The sum is averaged over the audible
    /// voices so three full-scale voices cannot exceed one voice's range.
    fn next_mixed_sample(&mut self) -> f64 {
        let mut accumulator = 0.0;
        let mut audible = 0usize;

        for voice in &mut self.voices {
            if !voice.is_enabled() {
                voice.signal_release();
            }
            if voice.is_audible() {
                accumulator += voice.next_sample();
                audible += 1;
            }
        }

        if audible == 0 {
            return 0.0;
        }
        (accumulator * self.master_volume) / audible as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{EnvelopeStage, Oscillator};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Output stream that records the queue depth seen at each push
    struct FakeOutput {
        queued: usize,
        observed_at_push: Vec<usize>,
    }

    impl FakeOutput {
        fn new() -> Self {
            Self {
                queued: 0,
                observed_at_push: Vec::new(),
            }
        }

        fn drain(&mut self, bytes: usize) {
            self.queued = self.queued.saturating_sub(bytes);
        }
    }

    impl OutputStream for FakeOutput {
        fn queued_bytes(&self) -> usize {
            self.queued
        }

        fn push(&mut self, samples: &[f32]) -> Result<(), StreamError> {
            self.observed_at_push.push(self.queued);
            self.queued += samples.len() * std::mem::size_of::<f32>();
            Ok(())
        }

        fn pause(&mut self) -> Result<(), StreamError> {
            Ok(())
        }

        fn resume(&mut self) -> Result<(), StreamError> {
            Ok(())
        }

        fn clear(&mut self) {
            self.queued = 0;
        }
    }

    #[test]
    fn test_engine_creation() {
        let engine = SynthEngine::new(44100.0, 512);
        assert_eq!(engine.sample_rate(), 44100.0);
        assert_eq!(engine.count_enabled(), 0);
        assert!(!engine.has_active_voices());
    }

    #[test]
    fn test_voice_config_partial_update() {
        let mut engine = SynthEngine::new(44100.0, 512);
        engine.set_voice_config(
            0,
            VoiceUpdate {
                frequency: Some(440.0),
                volume: Some(1.0),
                ..Default::default()
            },
        );

        let voice = engine.voice(0).unwrap();
        assert_eq!(voice.frequency(), 440.0);
        assert_eq!(voice.volume(), 1.0);
        assert!(voice.is_enabled());
        // Untouched fields keep their values
        assert_eq!(voice.waveform(), Waveform::Sine);
        assert_eq!(voice.detune_cents(), 0.0);
    }

    #[test]
    fn test_zero_volume_disables_voice() {
        let mut engine = SynthEngine::new(44100.0, 512);
        engine.set_voice_config(
            0,
            VoiceUpdate {
                volume: Some(0.5),
                ..Default::default()
            },
        );
        assert_eq!(engine.count_enabled(), 1);

        engine.set_voice_config(
            0,
            VoiceUpdate {
                volume: Some(0.0),
                ..Default::default()
            },
        );
        assert_eq!(engine.count_enabled(), 0);
    }

    #[test]
    fn test_invalid_voice_index_ignored() {
        let mut engine = SynthEngine::new(44100.0, 512);
        engine.set_voice_config(
            VOICE_COUNT + 4,
            VoiceUpdate {
                volume: Some(1.0),
                ..Default::default()
            },
        );
        assert_eq!(engine.count_enabled(), 0);
        assert!(engine.voice(VOICE_COUNT).is_none());
    }

    #[test]
    fn test_master_volume_clamped() {
        let mut engine = SynthEngine::new(44100.0, 512);
        engine.set_master_volume(1.5);
        assert_eq!(engine.master_volume(), 1.0);
        engine.set_master_volume(-0.2);
        assert_eq!(engine.master_volume(), 0.0);
    }

    #[test]
    fn test_mix_averages_over_audible_voices() {
        // Three identical full-scale voices must mix to a single voice's
        // sample, not triple amplitude
        let mut engine = SynthEngine::new(44100.0, 512);
        engine.set_master_volume(1.0);
        for index in 0..VOICE_COUNT {
            engine.set_voice_config(
                index,
                VoiceUpdate {
                    frequency: Some(440.0),
                    waveform: Some(Waveform::Sine),
                    volume: Some(1.0),
                    ..Default::default()
                },
            );
        }

        let mut reference = Oscillator::new(Waveform::Sine, 440.0, 44100.0);
        for _ in 0..1000 {
            let mixed = engine.next_mixed_sample();
            let single = f64::from(reference.next_sample());
            assert!(
                (mixed - single).abs() < 1e-9,
                "Expected {}, got {}",
                single,
                mixed
            );
        }
    }

    #[test]
    fn test_silence_with_no_voices() {
        let mut engine = SynthEngine::new(44100.0, 512);
        for _ in 0..100 {
            assert_eq!(engine.next_mixed_sample(), 0.0);
        }
    }

    #[test]
    fn test_update_block_in_range_and_nonsilent() {
        let mut engine = SynthEngine::new(44100.0, 512);
        engine.set_master_volume(1.0);
        engine.set_voice_config(
            0,
            VoiceUpdate {
                frequency: Some(440.0),
                waveform: Some(Waveform::Sine),
                volume: Some(1.0),
                ..Default::default()
            },
        );

        let mut output = FakeOutput::new();
        engine.update(&mut output).unwrap();

        assert_eq!(output.queued, 512 * 4);
        let mut block = vec![0.0f32; 512];
        engine.fill_block(&mut block);
        assert!(block.iter().any(|&s| s.abs() > 0.0), "Block should be non-silent");
        assert!(block.iter().all(|&s| (-1.0..=1.0).contains(&s)));
    }

    #[test]
    fn test_disable_routes_through_release_not_silence() {
        let mut engine = SynthEngine::new(44100.0, 64);
        engine.set_master_volume(1.0);
        {
            let voice = engine.voice_mut(0).unwrap();
            voice.enable_adsr(true);
            voice.set_adsr(Some(0.001), Some(0.001), Some(0.9), Some(0.05));
        }
        engine.set_voice_config(
            0,
            VoiceUpdate {
                frequency: Some(440.0),
                waveform: Some(Waveform::Sine),
                volume: Some(1.0),
                ..Default::default()
            },
        );

        let mut block = vec![0.0f32; 64];
        for _ in 0..20 {
            engine.fill_block(&mut block);
        }

        // Disabling with the volume intact leaves an audible, decaying tail
        engine.set_voice_config(
            0,
            VoiceUpdate {
                enabled: Some(false),
                ..Default::default()
            },
        );
        assert_eq!(engine.voice(0).unwrap().envelope().stage(), EnvelopeStage::Release);

        engine.fill_block(&mut block);
        assert!(
            block.iter().any(|&s| s.abs() > 0.0),
            "Release tail should be audible, not instant silence"
        );

        // The tail winds down to idle silence
        for _ in 0..100 {
            engine.fill_block(&mut block);
        }
        assert!(!engine.has_active_voices());
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_zero_volume_enters_release_stage() {
        let mut engine = SynthEngine::new(44100.0, 64);
        {
            let voice = engine.voice_mut(0).unwrap();
            voice.enable_adsr(true);
            voice.set_adsr(Some(0.001), Some(0.001), Some(0.8), Some(0.1));
        }
        engine.set_voice_config(
            0,
            VoiceUpdate {
                frequency: Some(440.0),
                volume: Some(1.0),
                ..Default::default()
            },
        );

        let mut block = vec![0.0f32; 64];
        for _ in 0..20 {
            engine.fill_block(&mut block);
        }

        engine.set_voice_config(
            0,
            VoiceUpdate {
                volume: Some(0.0),
                ..Default::default()
            },
        );

        // The envelope winds down through release instead of jumping to idle
        engine.fill_block(&mut block);
        assert_eq!(engine.voice(0).unwrap().envelope().stage(), EnvelopeStage::Release);

        for _ in 0..200 {
            engine.fill_block(&mut block);
        }
        assert_eq!(engine.voice(0).unwrap().envelope().stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn test_backpressure_never_pushes_into_full_queue() {
        let mut engine = SynthEngine::new(44100.0, 64);
        engine.set_voice_config(
            0,
            VoiceUpdate {
                frequency: Some(440.0),
                volume: Some(1.0),
                ..Default::default()
            },
        );

        let threshold = 64 * std::mem::size_of::<f32>();
        let mut output = FakeOutput::new();

        // Irregular drain keeps the queue hovering around the threshold
        for tick in 0..500 {
            engine.update(&mut output).unwrap();
            output.drain(if tick % 3 == 0 { threshold / 2 } else { 40 });
        }

        assert!(!output.observed_at_push.is_empty());
        assert!(
            output
                .observed_at_push
                .iter()
                .all(|&queued| queued < threshold),
            "push() called while a full block was still queued"
        );
    }

    #[test]
    fn test_update_skips_when_queue_full() {
        let mut engine = SynthEngine::new(44100.0, 64);
        engine.set_voice_config(
            0,
            VoiceUpdate {
                frequency: Some(440.0),
                volume: Some(1.0),
                ..Default::default()
            },
        );

        let mut output = FakeOutput::new();
        output.queued = 64 * std::mem::size_of::<f32>();

        engine.update(&mut output).unwrap();
        assert!(output.observed_at_push.is_empty(), "Full queue must not be pushed to");
    }

    #[test]
    fn test_randomize_respects_bounds() {
        let mut engine = SynthEngine::new(44100.0, 512);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            engine.randomize(&mut rng);
            for index in 0..VOICE_COUNT {
                let voice = engine.voice(index).unwrap();
                assert!((20.0..=20000.0).contains(&voice.frequency()));
                assert!((-50.0..=50.0).contains(&voice.detune_cents()));
                assert!((0.0..=1.0).contains(&voice.volume()));
                assert!((0.0..=1.0).contains(&voice.envelope().sustain()));
                assert!((0.01..=2.0).contains(&voice.envelope().attack()));
                assert!((0.01..=2.0).contains(&voice.envelope().decay()));
                assert!((0.01..=2.0).contains(&voice.envelope().release_time()));
                assert!((1.0..=20.0).contains(&voice.lfo().frequency()));
                assert!((0.0..=1.0).contains(&voice.lfo().amplitude()));
                assert!((200.0..=20000.0).contains(&voice.filter().cutoff()));
                assert!(voice.filter().resonance() <= 0.8);
            }
        }
    }

    #[test]
    fn test_randomize_is_deterministic() {
        let mut first = SynthEngine::new(44100.0, 512);
        let mut second = SynthEngine::new(44100.0, 512);

        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        first.randomize(&mut rng_a);
        second.randomize(&mut rng_b);

        for index in 0..VOICE_COUNT {
            let a = first.voice(index).unwrap();
            let b = second.voice(index).unwrap();
            assert_eq!(a.is_enabled(), b.is_enabled());
            assert_eq!(a.frequency(), b.frequency());
            assert_eq!(a.detune_cents(), b.detune_cents());
            assert_eq!(a.volume(), b.volume());
            assert_eq!(a.waveform(), b.waveform());
            assert_eq!(a.envelope().attack(), b.envelope().attack());
            assert_eq!(a.envelope().decay(), b.envelope().decay());
            assert_eq!(a.envelope().sustain(), b.envelope().sustain());
            assert_eq!(a.envelope().release_time(), b.envelope().release_time());
            assert_eq!(a.lfo().frequency(), b.lfo().frequency());
            assert_eq!(a.lfo().amplitude(), b.lfo().amplitude());
            assert_eq!(a.filter().cutoff(), b.filter().cutoff());
            assert_eq!(a.filter().resonance(), b.filter().resonance());
        }
    }
}
