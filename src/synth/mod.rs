//! Synthesis components
//!
//! Contains the oscillator, envelope, LFO, filter parameters, and voice.

mod envelope;
mod filter;
mod lfo;
mod oscillator;
mod voice;

pub use envelope::{Envelope, EnvelopeStage};
pub use filter::FilterParams;
pub use lfo::Lfo;
pub use oscillator::{Oscillator, Waveform};
pub use voice::{Voice, VoiceControl};
