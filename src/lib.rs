mod analyzer;
mod midi_importer;
mod model;
mod normalizer;
mod server;
mod service;
mod util;

#[cfg(test)]
mod fixtures;

pub use analyzer::ScoreAnalyzer;
pub use analyzer::key::*;
pub use analyzer::midi::*;
pub use midi_importer::*;
pub use model::config::*;
pub use model::notes::*;
pub use model::score::*;
pub use normalizer::*;
pub use server::*;
pub use service::*;
pub use util::*;
