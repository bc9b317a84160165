//! Real-time audio output using cpal
//!
//! The engine pushes blocks of mono samples into a queue and polls how much
//! queued audio remains; the device callback drains the queue at its own
//! pace. The queued-bytes poll is the sole synchronization point between the
//! two timelines.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};
use thiserror::Error;

/// Errors at the audio device boundary.
///
/// Device failures are fatal for the stream: there is no retry path that
/// preserves playback continuity, so they propagate to the caller.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("output device '{0}' not found")]
    DeviceNotFound(String),

    #[error("unsupported sample format {0:?}")]
    UnsupportedFormat(SampleFormat),

    #[error("failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query device config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("failed to pause audio stream: {0}")]
    Pause(#[from] cpal::PauseStreamError),
}

/// Block-push audio output with a queued-bytes backpressure query
pub trait OutputStream {
    /// Bytes of queued-but-unplayed audio
    fn queued_bytes(&self) -> usize;

    /// Enqueue a block of mono samples.
    ///
    /// Callers poll [`queued_bytes`](OutputStream::queued_bytes) first and
    /// only push when less than one block's worth remains queued.
    fn push(&mut self, samples: &[f32]) -> Result<(), StreamError>;

    /// Suspend playback
    fn pause(&mut self) -> Result<(), StreamError>;

    /// Resume playback
    fn resume(&mut self) -> Result<(), StreamError>;

    /// Discard queued-but-unplayed audio
    fn clear(&mut self);
}

/// cpal-backed output stream
pub struct CpalOutput {
    stream: Stream,
    queue: Arc<Mutex<VecDeque<f32>>>,
    sample_rate: u32,
}

impl CpalOutput {
    /// Open an output stream on the default device, or a named one
    pub fn new(sample_rate: u32, device_name: Option<&str>) -> Result<Self, StreamError> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .output_devices()?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| StreamError::DeviceNotFound(name.to_string()))?,
            None => host.default_output_device().ok_or(StreamError::NoDevice)?,
        };

        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let queue = Arc::new(Mutex::new(VecDeque::new()));

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, queue.clone())?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, queue.clone())?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, queue.clone())?,
            other => return Err(StreamError::UnsupportedFormat(other)),
        };

        stream.play()?;

        Ok(Self {
            stream,
            queue,
            sample_rate,
        })
    }

    /// Sample rate of the opened stream
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl OutputStream for CpalOutput {
    fn queued_bytes(&self) -> usize {
        let queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.len() * std::mem::size_of::<f32>()
    }

    fn push(&mut self, samples: &[f32]) -> Result<(), StreamError> {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.extend(samples.iter().copied());
        Ok(())
    }

    fn pause(&mut self) -> Result<(), StreamError> {
        self.stream.pause()?;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), StreamError> {
        self.stream.play()?;
        Ok(())
    }

    fn clear(&mut self) {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.clear();
    }
}

fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
    device: &Device,
    config: &StreamConfig,
    queue: Arc<Mutex<VecDeque<f32>>>,
) -> Result<Stream, StreamError> {
    let channels = config.channels as usize;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut queue = match queue.lock() {
                Ok(queue) => queue,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Mono engine samples fan out to every device channel;
            // underruns play silence
            for frame in data.chunks_mut(channels) {
                let sample = queue.pop_front().unwrap_or(0.0);
                for channel_sample in frame.iter_mut() {
                    *channel_sample = T::from_sample(sample);
                }
            }
        },
        |err| {
            eprintln!("Audio stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device().and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}
