use crate::model::config::ImportOptions;
use crate::model::score::*;
use anyhow::{Result, anyhow, bail};
use log::{debug, warn};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::HashMap;

/// Grids (in divisions of a quarter note) that offsets and lengths snap to.
const QUANTIZE_DIVISORS: [f64; 2] = [4.0, 3.0];
const OFFSET_EPSILON: f64 = 1e-9;

struct NoteInterval {
    pub midi: u8,
    pub start_tick: u64,
    pub end_tick: u64,
    pub velocity: u8,
    pub track: usize,
    /// Position of the NoteOn within its track.
    pub seq: usize,
}

struct OpenNote {
    start_tick: u64,
    velocity: u8,
    seq: usize,
}

/// Notes of one track that share an onset and a length.
struct OnsetGroup {
    offset: f64,
    quarter_length: f64,
    notes: Vec<ScoreNote>,
}

/// Decode a Standard MIDI File into a flattened score with offsets in quarter notes.
pub fn midi_bytes_to_score(bytes: &[u8], options: ImportOptions) -> Result<Score> {
    let smf = Smf::parse(bytes).map_err(|e| anyhow!("Failed to parse MIDI: {:?}", e))?;

    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(t) => t.as_int() as u64,
        Timing::Timecode(_fps, _subframe) => {
            bail!("SMPTE timecode midi timing is not currently supported..!");
        }
    };

    if ticks_per_quarter == 0 {
        bail!("MIDI header declares zero ticks per quarter note..!");
    }

    debug!("Ticks per quarter note: {}", ticks_per_quarter);
    debug!(
        "MIDI format: {:?}, tracks: {}",
        smf.header.format,
        smf.tracks.len()
    );

    let to_quarters = |tick: u64| tick as f64 / ticks_per_quarter as f64;

    let mut time_signatures: Vec<TimeSignature> = Vec::new();
    let mut tempo_marks: Vec<TempoMark> = Vec::new();
    let mut intervals: Vec<NoteInterval> = Vec::new();
    let mut open_notes: HashMap<(usize, u8, u8), Vec<OpenNote>> = HashMap::new();
    let mut last_tick: u64 = 0;

    for (track_idx, track) in smf.tracks.iter().enumerate() {
        let mut abs_tick: u64 = 0;
        let mut seq: usize = 0;

        for event in track.iter() {
            abs_tick = abs_tick.saturating_add(event.delta.as_int() as u64);
            last_tick = last_tick.max(abs_tick);

            match &event.kind {
                TrackEventKind::Meta(meta) => match meta {
                    MetaMessage::Tempo(micro) => {
                        let mpqn: u32 = micro.as_int();
                        tempo_marks.push(TempoMark {
                            offset: to_quarters(abs_tick),
                            micros_per_quarter: mpqn,
                        });
                        debug!(
                            "Tempo change at tick {} -> {} us/qn (track {})",
                            abs_tick, mpqn, track_idx
                        );
                    }
                    MetaMessage::TimeSignature(numerator, denominator_power, _, _) => {
                        time_signatures.push(TimeSignature {
                            offset: to_quarters(abs_tick),
                            numerator: *numerator,
                            denominator_power: *denominator_power,
                        });
                        debug!(
                            "Time signature at tick {} -> {}/2^{} (track {})",
                            abs_tick, numerator, denominator_power, track_idx
                        );
                    }
                    _ => {}
                },
                TrackEventKind::Midi { channel, message } => {
                    let ch: u8 = channel.as_int();

                    match message {
                        MidiMessage::NoteOn { key, vel } => {
                            let velocity: u8 = vel.as_int();

                            if velocity == 0 {
                                close_note(
                                    &mut open_notes,
                                    &mut intervals,
                                    (track_idx, ch, key.as_int()),
                                    abs_tick,
                                );
                            } else {
                                open_notes
                                    .entry((track_idx, ch, key.as_int()))
                                    .or_default()
                                    .push(OpenNote {
                                        start_tick: abs_tick,
                                        velocity,
                                        seq,
                                    });
                                seq += 1;
                            }
                        }
                        MidiMessage::NoteOff { key, vel: _ } => {
                            close_note(
                                &mut open_notes,
                                &mut intervals,
                                (track_idx, ch, key.as_int()),
                                abs_tick,
                            );
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }
    }

    for ((track, ch, key), stack) in open_notes.into_iter() {
        for open in stack {
            let end_tick = if last_tick > open.start_tick {
                last_tick
            } else {
                open.start_tick + ticks_per_quarter
            };

            warn!(
                "Unclosed NoteOn for {}, channel: {} at tick: {} auto-closing at: {}..!",
                key, ch, open.start_tick, end_tick
            );

            intervals.push(NoteInterval {
                midi: key,
                start_tick: open.start_tick,
                end_tick,
                velocity: open.velocity,
                track,
                seq: open.seq,
            });
        }
    }

    intervals.sort_by_key(|interval| (interval.track, interval.start_tick, interval.seq));

    let mut elements: Vec<Element> = Vec::new();
    let mut groups: Vec<OnsetGroup> = Vec::new();
    let mut current_track: Option<usize> = None;

    for interval in intervals.into_iter() {
        if current_track != Some(interval.track) {
            elements.extend(groups_to_elements(std::mem::take(&mut groups)));
            current_track = Some(interval.track);
        }

        let mut offset = to_quarters(interval.start_tick);
        let mut quarter_length = to_quarters(interval.end_tick.saturating_sub(interval.start_tick));
        if options.quantize {
            offset = quantize(offset);
            quarter_length = quantize_length(quarter_length);
        }

        let note = ScoreNote {
            pitch: Pitch::from_midi(interval.midi),
            velocity: Some(interval.velocity),
        };

        let chord = groups
            .iter_mut()
            .rev()
            .take_while(|group| (group.offset - offset).abs() < OFFSET_EPSILON)
            .find(|group| (group.quarter_length - quarter_length).abs() < OFFSET_EPSILON);

        match chord {
            Some(group) => group.notes.push(note),
            None => groups.push(OnsetGroup {
                offset,
                quarter_length,
                notes: vec![note],
            }),
        }
    }
    elements.extend(groups_to_elements(groups));

    elements.sort_by(|a, b| a.offset().total_cmp(&b.offset()));
    time_signatures.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    tempo_marks.sort_by(|a, b| a.offset.total_cmp(&b.offset));

    debug!(
        "Imported {} elements, {} time signatures, {} tempo marks..!",
        elements.len(),
        time_signatures.len(),
        tempo_marks.len()
    );

    Ok(Score {
        elements,
        time_signatures,
        tempo_marks,
    })
}

fn close_note(
    open_notes: &mut HashMap<(usize, u8, u8), Vec<OpenNote>>,
    intervals: &mut Vec<NoteInterval>,
    (track, ch, midi_num): (usize, u8, u8),
    abs_tick: u64,
) {
    match open_notes
        .get_mut(&(track, ch, midi_num))
        .and_then(|stack| stack.pop())
    {
        Some(open) => intervals.push(NoteInterval {
            midi: midi_num,
            start_tick: open.start_tick,
            end_tick: abs_tick,
            velocity: open.velocity,
            track,
            seq: open.seq,
        }),
        None => debug!(
            "Orphaned NoteOff for {} ch{} at tick {} (track {})..!",
            midi_num, ch, abs_tick, track
        ),
    }
}

/// Turn one track's onset groups into notes and chords, filling the gaps with rests.
fn groups_to_elements(groups: Vec<OnsetGroup>) -> Vec<Element> {
    let mut elements = Vec::with_capacity(groups.len());
    let mut cursor = 0.0_f64;

    for mut group in groups.into_iter() {
        if group.offset > cursor + OFFSET_EPSILON {
            elements.push(Element::Rest {
                offset: cursor,
                quarter_length: group.offset - cursor,
            });
        }
        cursor = cursor.max(group.offset + group.quarter_length);

        let element = if group.notes.len() == 1 {
            Element::Note {
                offset: group.offset,
                quarter_length: group.quarter_length,
                note: group.notes.remove(0),
            }
        } else {
            Element::Chord {
                offset: group.offset,
                quarter_length: group.quarter_length,
                velocity: group.notes.first().and_then(|note| note.velocity),
                notes: group.notes,
            }
        };
        elements.push(element);
    }

    elements
}

/// Snap to whichever of the quarter-note grids is closest (the first grid wins ties).
fn quantize(value: f64) -> f64 {
    let mut best = value;
    let mut best_error = f64::INFINITY;

    for divisor in QUANTIZE_DIVISORS {
        let snapped = (value * divisor).round() / divisor;
        let error = (value - snapped).abs();
        if error < best_error {
            best = snapped;
            best_error = error;
        }
    }

    best
}

fn quantize_length(value: f64) -> f64 {
    let snapped = quantize(value);
    if snapped <= 0.0 {
        1.0 / QUANTIZE_DIVISORS[0]
    } else {
        snapped
    }
}
