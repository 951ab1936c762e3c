use serde::{Deserialize, Serialize};

const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "G#", "A", "Bb", "B",
];

/// Symbolic accidental kinds a pitch can carry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum AccidentalType {
    Sharp,
    Flat,
    DoubleSharp,
    DoubleFlat,
    Natural,
    /// Any other named accidental (e.g. `half-sharp`), kept verbatim.
    Other(String),
}

/// Accidental descriptor attached to a pitch. Either half may be missing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Accidental {
    pub kind: Option<AccidentalType>,
    /// Alteration in semitones.
    pub alter: Option<f64>,
}

impl Accidental {
    pub fn sharp() -> Self {
        Self {
            kind: Some(AccidentalType::Sharp),
            alter: Some(1.0),
        }
    }

    pub fn flat() -> Self {
        Self {
            kind: Some(AccidentalType::Flat),
            alter: Some(-1.0),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Pitch {
    pub midi: u8,
    pub name_with_octave: String,
    pub accidental: Option<Accidental>,
}

impl Pitch {
    /// Spell a MIDI note number the way a notation frontend expects it (middle C is `C4`).
    pub fn from_midi(midi: u8) -> Self {
        let pitch_class = (midi % 12) as usize;
        let octave = (midi / 12) as i32 - 1;
        let name = PITCH_NAMES[pitch_class];

        let accidental = if name.ends_with('#') {
            Some(Accidental::sharp())
        } else if name.ends_with('b') {
            Some(Accidental::flat())
        } else {
            None
        };

        Self {
            midi,
            name_with_octave: format!("{}{}", name, octave),
            accidental,
        }
    }

    pub fn pitch_class(&self) -> usize {
        (self.midi % 12) as usize
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScoreNote {
    pub pitch: Pitch,
    pub velocity: Option<u8>,
}

/// A flattened musical element. Offsets and lengths are in quarter notes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Element {
    Note {
        offset: f64,
        quarter_length: f64,
        note: ScoreNote,
    },
    Chord {
        offset: f64,
        quarter_length: f64,
        notes: Vec<ScoreNote>,
        velocity: Option<u8>,
    },
    Rest {
        offset: f64,
        quarter_length: f64,
    },
}

impl Element {
    pub fn offset(&self) -> f64 {
        match self {
            Element::Note { offset, .. }
            | Element::Chord { offset, .. }
            | Element::Rest { offset, .. } => *offset,
        }
    }

    pub fn quarter_length(&self) -> f64 {
        match self {
            Element::Note { quarter_length, .. }
            | Element::Chord { quarter_length, .. }
            | Element::Rest { quarter_length, .. } => *quarter_length,
        }
    }

    /// Every sounding note of this element; empty for rests.
    pub fn notes(&self) -> &[ScoreNote] {
        match self {
            Element::Note { note, .. } => std::slice::from_ref(note),
            Element::Chord { notes, .. } => notes,
            Element::Rest { .. } => &[],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TimeSignature {
    pub offset: f64,
    pub numerator: u8,
    /// Denominator as a power of two, as stored in the file.
    pub denominator_power: u8,
}

impl TimeSignature {
    pub fn denominator(&self) -> Option<u32> {
        1u32.checked_shl(self.denominator_power as u32)
    }

    /// `"N/D"`, or `None` when the stored values cannot form a meter.
    pub fn label(&self) -> Option<String> {
        if self.numerator == 0 {
            return None;
        }
        self.denominator()
            .map(|denominator| format!("{}/{}", self.numerator, denominator))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TempoMark {
    pub offset: f64,
    pub micros_per_quarter: u32,
}

impl TempoMark {
    pub fn quarter_notes_per_minute(&self) -> Option<f64> {
        if self.micros_per_quarter == 0 {
            return None;
        }
        Some(60_000_000.0 / self.micros_per_quarter as f64)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Major,
    Minor,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Key {
    pub tonic: String,
    pub mode: Mode,
    /// Correlation coefficient of the winning key profile.
    pub correlation: f64,
}

impl Key {
    /// Tonic name, suffixed with `m` for minor keys.
    pub fn label(&self) -> String {
        match self.mode {
            Mode::Major => self.tonic.clone(),
            Mode::Minor => format!("{}m", self.tonic),
        }
    }
}

/// A parsed score: flattened elements plus the meter and tempo markings found in the file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Score {
    pub elements: Vec<Element>,
    pub time_signatures: Vec<TimeSignature>,
    pub tempo_marks: Vec<TempoMark>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn middle_c_is_c4_without_accidental() {
        let pitch = Pitch::from_midi(60);
        assert_eq!(pitch.name_with_octave, "C4");
        assert!(pitch.accidental.is_none());
    }

    #[test]
    fn black_keys_carry_accidentals() {
        let cs = Pitch::from_midi(61);
        assert_eq!(cs.name_with_octave, "C#4");
        assert_eq!(cs.accidental, Some(Accidental::sharp()));

        let bb = Pitch::from_midi(58);
        assert_eq!(bb.name_with_octave, "Bb3");
        assert_eq!(bb.accidental, Some(Accidental::flat()));

        assert_eq!(Pitch::from_midi(0).name_with_octave, "C-1");
        assert_eq!(Pitch::from_midi(127).name_with_octave, "G9");
    }

    #[test]
    fn time_signature_labels() {
        let common = TimeSignature {
            offset: 0.0,
            numerator: 6,
            denominator_power: 3,
        };
        assert_eq!(common.label().as_deref(), Some("6/8"));

        let broken = TimeSignature {
            offset: 0.0,
            numerator: 4,
            denominator_power: 40,
        };
        assert_eq!(broken.label(), None);
    }

    #[test]
    fn zero_tempo_has_no_qpm() {
        let mark = TempoMark {
            offset: 0.0,
            micros_per_quarter: 0,
        };
        assert_eq!(mark.quarter_notes_per_minute(), None);

        let mark = TempoMark {
            offset: 0.0,
            micros_per_quarter: 500_000,
        };
        assert_eq!(mark.quarter_notes_per_minute(), Some(120.0));
    }

    #[test]
    fn minor_keys_get_suffix() {
        let key = Key {
            tonic: "F#".into(),
            mode: Mode::Minor,
            correlation: 0.9,
        };
        assert_eq!(key.label(), "F#m");
    }
}
