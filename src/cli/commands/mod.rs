//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod ingest;
mod quiz;
mod search;
mod serve;
mod transcribe;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use ingest::run_ingest;
pub use quiz::run_quiz;
pub use search::run_search;
pub use serve::run_serve;
pub use transcribe::{run_embed, run_transcribe};
