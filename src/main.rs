use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use midi_notation_bridge::{
    Args, Command, ImportOptions, MidiScoreAnalyzer, MidiService, Server, parse_key_method,
};
use std::fs;
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let options = ImportOptions {
        quantize: !args.no_quantize,
        key_method: parse_key_method(&args.key_method),
    };
    let analyzer = MidiScoreAnalyzer::new(options);

    match args.command {
        Command::Serve {
            host,
            port,
            stage_dir,
            max_body_bytes,
        } => {
            let mut service = MidiService::new(analyzer);
            if let Some(dir) = stage_dir {
                info!("Staging uploads in '{}'..!", dir.display());
                service = service.with_stage_dir(dir);
            }

            let addr = format!("{}:{}", host, port);
            let server = Arc::new(Server::bind(&addr, service, max_body_bytes)?);
            let server_for_handler = Arc::clone(&server);

            ctrlc::set_handler(move || {
                warn!("Ctrl-C received, shutting down..!");
                server_for_handler.unblock();
            })
            .context("Error setting Ctrl-C handler..!")?;

            server.run();
            info!("Server stopped, exiting..!");
        }
        Command::Convert {
            midi,
            pretty,
            dry_run,
            dry_run_max,
        } => {
            info!("Converting MIDI file: '{}'...", midi.display());
            let bytes = fs::read(&midi)
                .with_context(|| format!("Failed to read MIDI file {}", midi.display()))?;
            let parsed = MidiService::new(analyzer).process_bytes(&bytes)?;

            if dry_run {
                info!(
                    "Metadata: {} / {} / {} us/qn / ppq {}",
                    parsed.metadata.time_signature,
                    parsed.metadata.key_signature,
                    parsed.metadata.tempo,
                    parsed.metadata.ppq
                );
                info!("Previewing at most {} events..!", dry_run_max);
                for event in parsed.all_parsed_notes.iter().take(dry_run_max) {
                    info!(
                        "{}: midi={} name={} ticks={} dur={} vel={} acc={:?}",
                        event.id,
                        event.midi,
                        event.note_name_with_octave,
                        event.ticks,
                        event.duration_ticks,
                        event.velocity,
                        event.accidental
                    );
                }
                return Ok(());
            }

            let json = if pretty {
                serde_json::to_string_pretty(&parsed)?
            } else {
                serde_json::to_string(&parsed)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}
