//! Transcription of video audio into timed transcript segments.

mod models;
mod service;
mod whisper;

pub use models::{TranscriptChunk, TranscriptData};
pub use service::TranscriptionService;
pub use whisper::{merge_parts, WhisperTranscriber};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Speech-to-text backend.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into timed segments.
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<TranscriptChunk>>;
}
