//! CLI interface for triosc

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Real-time three-voice oscillator synthesizer
#[derive(Parser)]
#[command(name = "triosc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play in real time until interrupted
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "triosc.yaml")]
        config: PathBuf,

        /// Randomize the patch with this seed instead of the default triad
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Render to a WAV file
    Record {
        /// Configuration file path
        #[arg(short, long, default_value = "triosc.yaml")]
        config: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Randomize the patch with this seed instead of the default triad
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List available audio output devices
    Devices,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "triosc.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
