pub mod config;
pub mod notes;
pub mod score;
