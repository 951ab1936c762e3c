use crate::analyzer::ScoreAnalyzer;
use crate::model::notes::{NoteEvent, ParsedScore, ScoreMetadata};
use crate::model::score::*;
use log::{debug, info, warn};

/// Fixed output resolution, independent of the source file's own division.
pub const DEFAULT_PPQ: u32 = 480;
pub const DEFAULT_MPQN: u32 = 500_000;
pub const DEFAULT_TIME_SIGNATURE: &str = "4/4";
pub const DEFAULT_KEY_SIGNATURE: &str = "C";
pub const DEFAULT_VELOCITY: u8 = 64;
const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;

/// Map a pitch's accidental to the frontend's symbol set.
///
/// The symbolic type wins over the numeric alteration; a natural (or a missing
/// type) falls back to the alteration, and anything unmappable yields `None`.
pub fn accidental_symbol(accidental: Option<&Accidental>) -> Option<String> {
    let accidental = accidental?;

    match &accidental.kind {
        Some(AccidentalType::Natural) | None => {}
        Some(AccidentalType::Sharp) => return Some("#".into()),
        Some(AccidentalType::Flat) => return Some("b".into()),
        Some(AccidentalType::DoubleSharp) => return Some("##".into()),
        Some(AccidentalType::DoubleFlat) => return Some("bb".into()),
        Some(AccidentalType::Other(name)) => return Some(name.clone()),
    }

    let alter = accidental.alter?;
    if alter == 1.0 {
        Some("#".into())
    } else if alter == -1.0 {
        Some("b".into())
    } else if alter == 2.0 {
        Some("##".into())
    } else if alter == -2.0 {
        Some("bb".into())
    } else {
        if alter != 0.0 {
            debug!("No accidental symbol for alteration {}..!", alter);
        }
        None
    }
}

fn quarters_to_ticks(quarters: f64, ppq: u32) -> Option<u64> {
    let ticks = (quarters * ppq as f64).round();
    if !ticks.is_finite() || ticks < 0.0 || ticks >= u64::MAX as f64 {
        return None;
    }
    Some(ticks as u64)
}

/// `(ticks, duration_ticks)` for an element, or `(0, 1)` when either cannot be computed.
fn element_ticks(element: &Element, ppq: u32) -> (u64, u64) {
    match (
        quarters_to_ticks(element.offset(), ppq),
        quarters_to_ticks(element.quarter_length(), ppq),
    ) {
        (Some(ticks), Some(duration_ticks)) => (ticks, duration_ticks),
        _ => {
            warn!(
                "Could not compute ticks for element at offset {} (length {}), using 0/1..!",
                element.offset(),
                element.quarter_length()
            );
            (0, 1)
        }
    }
}

fn note_event(
    id: usize,
    note: &ScoreNote,
    ticks: u64,
    duration_ticks: u64,
    velocity: u8,
) -> NoteEvent {
    let accidental = accidental_symbol(note.pitch.accidental.as_ref());
    debug!(
        "Note: ticks={} midi={} name={} accidental={:?}",
        ticks, note.pitch.midi, note.pitch.name_with_octave, accidental
    );

    NoteEvent {
        id: format!("note-{}", id),
        midi: note.pitch.midi,
        ticks,
        duration_ticks,
        track: 0,
        channel: 0,
        velocity,
        accidental,
        note_name_with_octave: note.pitch.name_with_octave.clone(),
    }
}

/// Flatten notes and chords into tick-addressed note events sorted by `(ticks, midi)`.
///
/// Ids follow emission order, so after sorting they are not necessarily ascending.
pub fn normalize_notes(elements: &[Element], ppq: u32) -> Vec<NoteEvent> {
    let mut events: Vec<NoteEvent> = Vec::new();

    for element in elements {
        let (ticks, duration_ticks) = element_ticks(element, ppq);

        match element {
            Element::Note { note, .. } => {
                let velocity = note.velocity.unwrap_or(DEFAULT_VELOCITY);
                events.push(note_event(events.len(), note, ticks, duration_ticks, velocity));
            }
            Element::Chord {
                notes, velocity, ..
            } => {
                debug!(
                    "Chord at ticks {} with {} pitches",
                    ticks,
                    notes.len()
                );
                for member in notes {
                    let velocity = member.velocity.or(*velocity).unwrap_or(DEFAULT_VELOCITY);
                    events.push(note_event(
                        events.len(),
                        member,
                        ticks,
                        duration_ticks,
                        velocity,
                    ));
                }
            }
            Element::Rest { .. } => {}
        }
    }

    events.sort_by_key(|event| (event.ticks, event.midi));
    events
}

pub fn time_signature_label(score: &Score) -> String {
    match score.time_signatures.first() {
        Some(signature) => signature.label().unwrap_or_else(|| {
            warn!(
                "Unreadable time signature {}/2^{}, using {}..!",
                signature.numerator, signature.denominator_power, DEFAULT_TIME_SIGNATURE
            );
            DEFAULT_TIME_SIGNATURE.to_string()
        }),
        None => DEFAULT_TIME_SIGNATURE.to_string(),
    }
}

pub fn key_signature_label<A: ScoreAnalyzer + ?Sized>(score: &Score, analyzer: &A) -> String {
    match analyzer.analyze_key(score) {
        Ok(Some(key)) => {
            let label = key.label();
            debug!("Key signature: {}", label);
            label
        }
        Ok(None) => {
            warn!("No key detected, using {}..!", DEFAULT_KEY_SIGNATURE);
            DEFAULT_KEY_SIGNATURE.to_string()
        }
        Err(why) => {
            warn!(
                "Key analysis failed: {:#}, using {}..!",
                why, DEFAULT_KEY_SIGNATURE
            );
            DEFAULT_KEY_SIGNATURE.to_string()
        }
    }
}

/// Microseconds per quarter note of the first usable tempo mark.
pub fn tempo_micros(score: &Score) -> u32 {
    let found = score
        .tempo_marks
        .iter()
        .filter_map(TempoMark::quarter_notes_per_minute)
        .find(|qpm| qpm.is_finite() && *qpm > 0.0);

    match found {
        Some(qpm) => {
            let mpqn = (MICROSECONDS_PER_MINUTE / qpm).round() as u32;
            debug!("Tempo: {:.3} QPM ({} us/qn)", qpm, mpqn);
            mpqn
        }
        None => {
            warn!(
                "No tempo found, using {} us/qn (120 QPM)..!",
                DEFAULT_MPQN
            );
            DEFAULT_MPQN
        }
    }
}

pub fn extract_metadata<A: ScoreAnalyzer + ?Sized>(score: &Score, analyzer: &A) -> ScoreMetadata {
    ScoreMetadata {
        time_signature: time_signature_label(score),
        key_signature: key_signature_label(score, analyzer),
        tempo: tempo_micros(score),
        ppq: DEFAULT_PPQ,
    }
}

pub fn build_parsed_score<A: ScoreAnalyzer + ?Sized>(score: &Score, analyzer: &A) -> ParsedScore {
    let metadata = extract_metadata(score, analyzer);
    let all_parsed_notes = normalize_notes(&score.elements, metadata.ppq);

    info!(
        "Extracted {} note events ({} / {} / {} us/qn)..!",
        all_parsed_notes.len(),
        metadata.time_signature,
        metadata.key_signature,
        metadata.tempo
    );

    ParsedScore {
        metadata,
        all_parsed_notes,
    }
}
