//! Key detection by correlating a duration-weighted pitch-class histogram against
//! rotated major/minor key profiles.

use crate::model::config::KeyMethod;
use crate::model::score::{Element, Key, Mode};
use log::debug;

const AARDEN_ESSEN_MAJOR: [f64; 12] = [
    17.7661, 0.145624, 14.9265, 0.160186, 19.8049, 11.3587, 0.291248, 22.062, 0.145624, 8.15494,
    0.232998, 4.95122,
];
const AARDEN_ESSEN_MINOR: [f64; 12] = [
    18.2648, 0.737619, 14.0499, 16.8599, 0.702494, 14.4362, 0.702494, 18.6161, 4.56621, 1.93186,
    7.37619, 1.75623,
];

const KRUMHANSL_KESSLER_MAJOR: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
const KRUMHANSL_KESSLER_MINOR: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

const MAJOR_TONICS: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];
const MINOR_TONICS: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "G#", "A", "Bb", "B",
];

fn profiles(method: KeyMethod) -> (&'static [f64; 12], &'static [f64; 12]) {
    match method {
        KeyMethod::AardenEssen => (&AARDEN_ESSEN_MAJOR, &AARDEN_ESSEN_MINOR),
        KeyMethod::KrumhanslKessler => (&KRUMHANSL_KESSLER_MAJOR, &KRUMHANSL_KESSLER_MINOR),
    }
}

/// Total sounding quarter lengths per pitch class; chord members each count in full.
pub fn pitch_class_weights(elements: &[Element]) -> [f64; 12] {
    let mut weights = [0.0; 12];

    for element in elements {
        let length = element.quarter_length();
        if !length.is_finite() || length <= 0.0 {
            continue;
        }
        for note in element.notes() {
            weights[note.pitch.pitch_class()] += length;
        }
    }

    weights
}

fn pearson(xs: &[f64; 12], ys: &[f64; 12], rotation: usize) -> Option<f64> {
    let n = 12.0;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;

    for i in 0..12 {
        // profile index is relative to the candidate tonic
        let dx = xs[(i + rotation) % 12] - mean_x;
        let dy = ys[i] - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }

    let denominator = (variance_x * variance_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }

    Some(covariance / denominator)
}

/// Best-matching key for the sounding notes, or `None` when nothing sounds.
pub fn detect_key(elements: &[Element], method: KeyMethod) -> Option<Key> {
    let weights = pitch_class_weights(elements);
    let (major, minor) = profiles(method);

    let mut best: Option<Key> = None;
    for (mode, profile, names) in [
        (Mode::Major, major, &MAJOR_TONICS),
        (Mode::Minor, minor, &MINOR_TONICS),
    ] {
        for tonic in 0..12 {
            let Some(correlation) = pearson(&weights, profile, tonic) else {
                continue;
            };

            if best
                .as_ref()
                .is_none_or(|current| correlation > current.correlation)
            {
                best = Some(Key {
                    tonic: names[tonic].to_string(),
                    mode,
                    correlation,
                });
            }
        }
    }

    if let Some(key) = &best {
        debug!(
            "Detected key {} (r = {:.3}) using {:?}",
            key.label(),
            key.correlation,
            method
        );
    }

    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::score::{Pitch, ScoreNote};

    fn note(offset: f64, quarter_length: f64, midi: u8) -> Element {
        Element::Note {
            offset,
            quarter_length,
            note: ScoreNote {
                pitch: Pitch::from_midi(midi),
                velocity: Some(64),
            },
        }
    }

    fn melody(notes: &[(u8, f64)]) -> Vec<Element> {
        let mut offset = 0.0;
        notes
            .iter()
            .map(|&(midi, length)| {
                let element = note(offset, length, midi);
                offset += length;
                element
            })
            .collect()
    }

    #[test]
    fn c_major_material() {
        let elements = melody(&[
            (60, 4.0),
            (62, 1.0),
            (64, 2.0),
            (65, 1.0),
            (67, 3.0),
            (69, 1.0),
            (71, 1.0),
        ]);

        let key = detect_key(&elements, KeyMethod::AardenEssen).unwrap();
        assert_eq!(key.label(), "C");
        assert_eq!(key.mode, Mode::Major);
    }

    #[test]
    fn a_minor_material() {
        let elements = melody(&[
            (57, 4.0),
            (59, 1.0),
            (60, 2.0),
            (62, 1.0),
            (64, 3.0),
            (65, 1.0),
            (68, 1.0),
        ]);

        let key = detect_key(&elements, KeyMethod::AardenEssen).unwrap();
        assert_eq!(key.label(), "Am");
    }

    #[test]
    fn krumhansl_profiles_agree_on_a_plain_triad() {
        let elements = melody(&[(60, 4.0), (64, 2.0), (67, 2.0), (72, 2.0)]);
        let key = detect_key(&elements, KeyMethod::KrumhanslKessler).unwrap();
        assert_eq!(key.label(), "C");
    }

    #[test]
    fn rests_only_means_no_key() {
        let elements = vec![Element::Rest {
            offset: 0.0,
            quarter_length: 4.0,
        }];
        assert!(detect_key(&elements, KeyMethod::AardenEssen).is_none());
        assert!(detect_key(&[], KeyMethod::AardenEssen).is_none());
    }

    #[test]
    fn chords_weight_every_member() {
        let elements = vec![Element::Chord {
            offset: 0.0,
            quarter_length: 2.0,
            velocity: None,
            notes: [60, 64, 67]
                .iter()
                .map(|&midi| ScoreNote {
                    pitch: Pitch::from_midi(midi),
                    velocity: None,
                })
                .collect(),
        }];

        let weights = pitch_class_weights(&elements);
        assert_eq!(weights[0], 2.0);
        assert_eq!(weights[4], 2.0);
        assert_eq!(weights[7], 2.0);
        assert_eq!(weights.iter().sum::<f64>(), 6.0);
    }
}
