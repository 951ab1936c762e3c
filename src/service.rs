use crate::analyzer::ScoreAnalyzer;
use crate::model::notes::ParsedScore;
use crate::model::score::Score;
use crate::normalizer::build_parsed_score;
use crate::util::strip_data_url_header;
use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, error, info, warn};
use serde_json::{Value, json};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No MIDI data sent or invalid JSON format..!")]
    MissingInput,

    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Request body exceeds the limit of {0} bytes..!")]
    PayloadTooLarge(usize),

    #[error("Internal server error while processing MIDI: {0:#}")]
    Processing(anyhow::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::MissingInput | ServiceError::InvalidJson(_) => 400,
            ServiceError::PayloadTooLarge(_) => 413,
            ServiceError::Processing(_) => 500,
        }
    }

    pub fn to_body(&self) -> Value {
        match self {
            ServiceError::Processing(why) => json!({
                "error": self.to_string(),
                "detail": format!("{:?}", why),
            }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: Value,
}

impl From<ServiceError> for ServiceResponse {
    fn from(err: ServiceError) -> Self {
        Self {
            status: err.status_code(),
            body: err.to_body(),
        }
    }
}

/// Decode the `midiData` field: optional data-URL header, then standard padded base64.
pub fn decode_midi_data(midi_data: &str) -> anyhow::Result<Vec<u8>> {
    let encoded: String = strip_data_url_header(midi_data)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(encoded.as_bytes())
        .context("Failed to decode base64 MIDI data")
}

fn parse_payload(body: &[u8]) -> Result<String, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ServiceError::MissingInput);
    }

    let request: Value = serde_json::from_slice(body)?;
    let Value::Object(mut fields) = request else {
        return Err(ServiceError::MissingInput);
    };

    match fields.remove("midiData") {
        Some(Value::String(midi_data)) if !midi_data.is_empty() => Ok(midi_data),
        _ => Err(ServiceError::MissingInput),
    }
}

/// Converts uploaded MIDI into [`ParsedScore`]s. Holds no per-request state.
#[derive(Debug)]
pub struct MidiService<A: ScoreAnalyzer> {
    analyzer: A,
    stage_dir: Option<PathBuf>,
}

impl<A: ScoreAnalyzer> MidiService<A> {
    pub fn new(analyzer: A) -> Self {
        Self {
            analyzer,
            stage_dir: None,
        }
    }

    /// Write each upload to a temporary `.mid` file in `dir` and parse it from there.
    pub fn with_stage_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.stage_dir = Some(dir.into());
        self
    }

    /// Run the full pipeline on raw MIDI file bytes.
    pub fn process_bytes(&self, bytes: &[u8]) -> anyhow::Result<ParsedScore> {
        let score = match &self.stage_dir {
            Some(dir) => self.parse_staged(dir, bytes)?,
            None => self.analyzer.parse(bytes)?,
        };
        debug!("MIDI analysis finished with {} elements", score.elements.len());

        Ok(build_parsed_score(&score, &self.analyzer))
    }

    pub fn process_payload(&self, midi_data: &str) -> anyhow::Result<ParsedScore> {
        let bytes = decode_midi_data(midi_data)?;
        debug!("Decoded {} MIDI bytes from payload", bytes.len());
        self.process_bytes(&bytes)
    }

    pub fn process_request(&self, body: &[u8]) -> Result<ParsedScore, ServiceError> {
        let midi_data = parse_payload(body)?;
        self.process_payload(&midi_data)
            .map_err(ServiceError::Processing)
    }

    /// Status code and JSON body for a `/process_midi` request body.
    pub fn handle(&self, body: &[u8]) -> ServiceResponse {
        info!("Received MIDI conversion request ({} bytes)..!", body.len());

        let result = self.process_request(body).and_then(|parsed| {
            serde_json::to_value(&parsed).map_err(|e| ServiceError::Processing(e.into()))
        });

        match result {
            Ok(body) => ServiceResponse { status: 200, body },
            Err(err) => {
                if err.status_code() >= 500 {
                    error!("MIDI processing failed: {:?}", err);
                } else {
                    warn!("Rejected MIDI request: {}", err);
                }
                err.into()
            }
        }
    }

    fn parse_staged(&self, dir: &Path, bytes: &[u8]) -> anyhow::Result<Score> {
        let mut staged = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".mid")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create staging file in {}", dir.display()))?;
        let staged_path = staged.path().to_path_buf();

        debug!("Staging upload at {}", staged_path.display());

        // staged file is removed when `staged` drops, on every path out of here
        staged
            .write_all(bytes)
            .and_then(|_| staged.flush())
            .context("Failed to write staging file")?;

        let score = fs::read(&staged_path)
            .with_context(|| format!("Failed to read staged file {}", staged_path.display()))
            .and_then(|staged_bytes| self.analyzer.parse(&staged_bytes));

        match staged.close() {
            Ok(()) => debug!("Removed staged file {}", staged_path.display()),
            Err(why) => warn!(
                "Could not remove staged file {}: {}..!",
                staged_path.display(),
                why
            ),
        }

        score
    }
}
