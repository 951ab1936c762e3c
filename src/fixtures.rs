//! Synthesized Standard MIDI Files for unit tests.

use midly::num::{u4, u7, u15, u24, u28};
use midly::{
    Format, Fps, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
};

/// Collects events at absolute ticks; note-offs sort before note-ons on the same tick.
#[derive(Default)]
pub struct TrackBuilder {
    events: Vec<(u32, u8, TrackEventKind<'static>)>,
}

impl TrackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(self, start: u32, length: u32, key: u8, velocity: u8) -> Self {
        self.note_on(start, key, velocity).note_off(start + length, key)
    }

    pub fn note_on(mut self, tick: u32, key: u8, velocity: u8) -> Self {
        self.events.push((
            tick,
            1,
            TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOn {
                    key: u7::new(key),
                    vel: u7::new(velocity),
                },
            },
        ));
        self
    }

    pub fn note_off(mut self, tick: u32, key: u8) -> Self {
        self.events.push((
            tick,
            0,
            TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOff {
                    key: u7::new(key),
                    vel: u7::new(0),
                },
            },
        ));
        self
    }

    pub fn tempo(mut self, tick: u32, micros_per_quarter: u32) -> Self {
        self.events.push((
            tick,
            0,
            TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros_per_quarter))),
        ));
        self
    }

    pub fn time_signature(mut self, tick: u32, numerator: u8, denominator_power: u8) -> Self {
        self.events.push((
            tick,
            0,
            TrackEventKind::Meta(MetaMessage::TimeSignature(
                numerator,
                denominator_power,
                24,
                8,
            )),
        ));
        self
    }

    fn build(mut self) -> Vec<TrackEvent<'static>> {
        self.events.sort_by_key(|(tick, order, _)| (*tick, *order));

        let mut last_tick = 0;
        let mut track = Vec::with_capacity(self.events.len() + 1);
        for (tick, _, kind) in self.events {
            track.push(TrackEvent {
                delta: u28::new(tick - last_tick),
                kind,
            });
            last_tick = tick;
        }
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });

        track
    }
}

fn write_smf(timing: Timing, tracks: Vec<TrackBuilder>) -> Vec<u8> {
    let format = if tracks.len() > 1 {
        Format::Parallel
    } else {
        Format::SingleTrack
    };

    let smf = Smf {
        header: Header::new(format, timing),
        tracks: tracks.into_iter().map(TrackBuilder::build).collect(),
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes).expect("Writing a MIDI file into memory should not fail..!");
    bytes
}

pub fn smf_bytes(ticks_per_quarter: u16, tracks: Vec<TrackBuilder>) -> Vec<u8> {
    write_smf(Timing::Metrical(u15::new(ticks_per_quarter)), tracks)
}

pub fn smpte_bytes(track: TrackBuilder) -> Vec<u8> {
    write_smf(Timing::Timecode(Fps::Fps25, 40), vec![track])
}
