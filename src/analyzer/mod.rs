use crate::model::score::{Key, Score};

pub mod key;
pub mod midi;

pub trait ScoreAnalyzer: Send + Sync {
    /// Decode raw file bytes into a flattened score.
    fn parse(&self, bytes: &[u8]) -> anyhow::Result<Score>;

    /// Best-effort key of the score; `Ok(None)` when no key can be inferred.
    fn analyze_key(&self, score: &Score) -> anyhow::Result<Option<Key>>;
}
