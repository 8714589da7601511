//! OpenAI Whisper transcription.

use super::{Transcriber, TranscriptChunk};
use crate::audio::split_audio;
use crate::config::TranscriptionSettings;
use crate::error::{Result, StudError};
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Transcriber backed by the OpenAI audio transcription endpoint.
pub struct WhisperTranscriber {
    client: Client<OpenAIConfig>,
    model: String,
    chunk_duration_seconds: u32,
    max_concurrent_chunks: usize,
}

impl WhisperTranscriber {
    pub fn new(client: Client<OpenAIConfig>, settings: &TranscriptionSettings) -> Self {
        Self {
            client,
            model: settings.model.clone(),
            chunk_duration_seconds: settings.chunk_duration_seconds,
            max_concurrent_chunks: settings.max_concurrent_chunks.max(1),
        }
    }

    /// Transcribe one file that fits within the upload limit.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_single(&self, audio_path: &Path) -> Result<Vec<TranscriptChunk>> {
        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson)
            .build()
            .map_err(|e| StudError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| StudError::OpenAI(format!("Whisper API error: {}", e)))?;

        let segments = match response.segments {
            Some(segments) => segments
                .iter()
                .map(|s| TranscriptChunk::new(s.start as f64, s.end as f64, s.text.trim()))
                .collect(),
            // No segment data: keep the whole text as one chunk
            None => vec![TranscriptChunk::new(
                0.0,
                response.duration as f64,
                response.text.trim(),
            )],
        };

        debug!("Transcribed {} segments", segments.len());
        Ok(segments)
    }
}

/// Shift each part's segments by its offset and concatenate in part order.
pub fn merge_parts(mut parts: Vec<(usize, f64, Vec<TranscriptChunk>)>) -> Vec<TranscriptChunk> {
    parts.sort_by_key(|(idx, _, _)| *idx);

    parts
        .into_iter()
        .flat_map(|(_, offset, segments)| {
            segments.into_iter().map(move |mut s| {
                s.start += offset;
                s.end += offset;
                s
            })
        })
        .collect()
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<TranscriptChunk>> {
        let temp_dir = tempfile::tempdir()?;
        let parts = split_audio(audio_path, temp_dir.path(), self.chunk_duration_seconds).await?;

        if parts.len() == 1 {
            return self.transcribe_single(audio_path).await;
        }

        info!("Transcribing {} audio parts with {}", parts.len(), self.model);

        let mut results = Vec::with_capacity(parts.len());
        let mut stream = stream::iter(parts.into_iter().enumerate())
            .map(|(idx, (part_path, offset))| async move {
                let result = self.transcribe_single(&part_path).await;
                (idx, offset, result)
            })
            .buffer_unordered(self.max_concurrent_chunks);

        while let Some((idx, offset, result)) = stream.next().await {
            match result {
                Ok(segments) => results.push((idx, offset, segments)),
                Err(e) => {
                    return Err(StudError::Transcription(format!(
                        "Part {} at {:.0}s failed: {}",
                        idx, offset, e
                    )));
                }
            }
        }

        Ok(merge_parts(results))
    }
}
