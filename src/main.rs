//! Triosc - real-time three-voice oscillator synthesizer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use triosc::config;
use triosc::engine::{
    self, CpalOutput, OutputStream, Recorder, SynthEngine, VoiceUpdate, VOICE_COUNT,
};
use triosc::synth::{VoiceControl, Waveform};

mod cli;

use cli::{Cli, Commands};

/// Control-thread tick interval between engine updates
const TICK: Duration = Duration::from_millis(2);

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play { config: config_path, seed } => {
            println!("Loading configuration from {:?}...", config_path);
            let cfg = config::load_config(&config_path)?;

            println!("Starting triosc...");
            println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
            println!("  Block size: {} samples", cfg.audio.buffer_size);
            println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);

            let mut output = CpalOutput::new(cfg.audio.sample_rate, cfg.audio.device.as_deref())?;
            let mut engine = SynthEngine::new(cfg.audio.sample_rate as f64, cfg.audio.buffer_size);
            engine.set_master_volume(cfg.master.volume);
            apply_patch(&mut engine, seed);

            let running = Arc::new(AtomicBool::new(true));
            let handler_flag = running.clone();
            ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))?;

            println!("\nPlaying. Press Ctrl-C to stop.");
            while running.load(Ordering::SeqCst) {
                engine.update(&mut output)?;
                std::thread::sleep(TICK);
            }

            // Route every voice through its release tail before tearing down
            for index in 0..VOICE_COUNT {
                engine.set_voice_config(
                    index,
                    VoiceUpdate {
                        enabled: Some(false),
                        ..Default::default()
                    },
                );
            }
            let mut ticks = 0;
            while engine.has_active_voices() && ticks < 1000 {
                engine.update(&mut output)?;
                std::thread::sleep(TICK);
                ticks += 1;
            }
            while output.queued_bytes() > 0 && ticks < 1200 {
                std::thread::sleep(TICK);
                ticks += 1;
            }
            output.clear();
            println!("\nStopped.");
        }

        Commands::Record {
            config: config_path,
            output,
            duration,
            seed,
        } => {
            println!("Loading configuration from {:?}...", config_path);
            let cfg = config::load_config(&config_path)?;

            println!("Rendering {} seconds to {:?}...", duration, output);

            let sample_rate = cfg.audio.sample_rate;
            let mut engine = SynthEngine::new(sample_rate as f64, cfg.audio.buffer_size);
            engine.set_master_volume(cfg.master.volume);
            apply_patch(&mut engine, seed);

            let mut recorder = Recorder::new(&output, sample_rate)?;
            let total_samples = (sample_rate as u64 * duration) as usize;
            let mut block = vec![0.0f32; cfg.audio.buffer_size];
            let mut written = 0usize;

            while written < total_samples {
                let len = (total_samples - written).min(block.len());
                engine.fill_block(&mut block[..len]);
                recorder.write_block(&block[..len])?;
                written += len;

                // Progress update every second
                let seconds_done = written / sample_rate as usize;
                if seconds_done != (written - len) / sample_rate as usize {
                    print!("\r  Progress: {}s / {}s", seconds_done, duration);
                    use std::io::Write;
                    std::io::stdout().flush()?;
                }
            }

            recorder.finalize()?;
            println!("\nRendered to {:?}", output);
        }

        Commands::Devices => {
            println!("Available audio output devices:\n");

            if let Some(name) = engine::default_device_name() {
                println!("Default output: {}", name);
                println!();
            }

            let devices = engine::list_output_devices();
            if devices.is_empty() {
                println!("  (none found)");
            }
            for (name, config) in devices {
                println!(
                    "  - {} ({} Hz, {} ch)",
                    name, config.sample_rate.0, config.channels
                );
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!("  Block size: {}", cfg.audio.buffer_size);
                    println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);
                    match cfg.audio.device {
                        Some(device) => println!("  Device: {}", device),
                        None => println!("  Device: system default"),
                    }
                }
                Err(e) => {
                    println!("Configuration is invalid: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let example_config = include_str!("../triosc.example.yaml");

            let path = "triosc.yaml";
            if std::path::Path::new(path).exists() {
                println!("triosc.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, example_config)?;
                println!("Created triosc.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

/// Set up the starting patch: a seeded random patch, or the default triad
fn apply_patch(engine: &mut SynthEngine, seed: Option<u64>) {
    match seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            engine.randomize(&mut rng);
            println!("  Patch: randomized (seed {})", seed);
        }
        None => {
            default_triad(engine);
            println!("  Patch: default triad");
        }
    }
}

/// A major triad across the three voices, slightly spread by detune
fn default_triad(engine: &mut SynthEngine) {
    let notes = [
        (220.00, Waveform::Saw, 4.0),
        (277.18, Waveform::Square, 0.0),
        (329.63, Waveform::Sine, -4.0),
    ];

    for (index, (frequency, waveform, detune_cents)) in notes.into_iter().enumerate() {
        if let Some(voice) = engine.voice_mut(index) {
            voice.enable_adsr(true);
            voice.set_adsr(Some(0.05), Some(0.1), Some(0.8), Some(0.4));
        }
        engine.set_voice_config(
            index,
            VoiceUpdate {
                frequency: Some(frequency),
                waveform: Some(waveform),
                detune_cents: Some(detune_cents),
                volume: Some(0.8),
                ..Default::default()
            },
        );
    }
}
