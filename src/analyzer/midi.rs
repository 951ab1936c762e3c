use crate::analyzer::ScoreAnalyzer;
use crate::analyzer::key::detect_key;
use crate::midi_importer::midi_bytes_to_score;
use crate::model::config::ImportOptions;
use crate::model::score::{Key, Score};

/// Standard MIDI File analyzer backed by `midly` and the key-profile correlation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MidiScoreAnalyzer {
    options: ImportOptions,
}

impl MidiScoreAnalyzer {
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }
}

impl ScoreAnalyzer for MidiScoreAnalyzer {
    fn parse(&self, bytes: &[u8]) -> anyhow::Result<Score> {
        midi_bytes_to_score(bytes, self.options)
    }

    fn analyze_key(&self, score: &Score) -> anyhow::Result<Option<Key>> {
        Ok(detect_key(&score.elements, self.options.key_method))
    }
}
