//! Triosc - real-time three-voice oscillator synthesizer
//!
//! Three independently configured oscillator voices, each with an ADSR
//! envelope and modulation LFO, mixed down and streamed to an audio device
//! under queued-bytes backpressure.

pub mod config;
pub mod engine;
pub mod synth;

pub use config::EngineConfig;
pub use engine::SynthEngine;
