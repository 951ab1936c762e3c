use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "midi_notation_bridge",
    about = "Turn MIDI files into normalized note JSON for a notation frontend!"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Key-detection profile: aarden|krumhansl.
    #[arg(long, global = true, env = "MIDI_BRIDGE_KEY_METHOD", default_value = "aarden")]
    pub key_method: String,

    /// Keep raw offsets and durations instead of snapping them to 1/4 or 1/3 quarter notes.
    #[arg(long, global = true, default_value_t = false)]
    pub no_quantize: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the `/process_midi` endpoint over HTTP.
    Serve {
        /// Address to bind to.
        #[arg(long, env = "MIDI_BRIDGE_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on.
        #[arg(short, long, env = "MIDI_BRIDGE_PORT", default_value_t = 5000)]
        port: u16,

        /// Stage every upload as a temporary `.mid` file in this directory before parsing.
        #[arg(long = "stage-dir")]
        stage_dir: Option<PathBuf>,

        /// Largest request body accepted, in bytes.
        #[arg(long, default_value_t = 32 * 1024 * 1024)]
        max_body_bytes: usize,
    },

    /// Convert a local MIDI file and print the response JSON.
    Convert {
        /// Path to the target MIDI file.
        midi: PathBuf,

        /// Pretty-print the JSON output.
        #[arg(long, default_value_t = false)]
        pretty: bool,

        /// Dry run (log the first dry_run_max note events instead of printing JSON).
        #[arg(short, long, default_value_t = false)]
        dry_run: bool,

        /// Maximum events to log in dry run.
        #[arg(long, default_value_t = 80)]
        dry_run_max: usize,
    },
}

/// Key profiles available to the key analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyMethod {
    #[default]
    AardenEssen,
    KrumhanslKessler,
}

/// Knobs for turning a MIDI file into a score.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub quantize: bool,
    pub key_method: KeyMethod,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            quantize: true,
            key_method: KeyMethod::default(),
        }
    }
}
