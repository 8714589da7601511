//! Download, transcribe and store a video transcript.

use super::{Transcriber, TranscriptData};
use crate::audio::{cleanup_audio, download_audio};
use crate::error::Result;
use crate::storage::{validate_id, Collection, JsonStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Transcription pipeline for a single video.
#[derive(Clone)]
pub struct TranscriptionService {
    transcriber: Arc<dyn Transcriber>,
    store: JsonStore,
    download_timeout: Duration,
}

impl TranscriptionService {
    pub fn new(transcriber: Arc<dyn Transcriber>, store: JsonStore, download_timeout: Duration) -> Self {
        Self {
            transcriber,
            store,
            download_timeout,
        }
    }

    /// Download the audio, transcribe it and save `transcripts/<video_id>.json`.
    ///
    /// With `cleanup_audio` the downloaded file is removed afterwards, whether
    /// or not transcription succeeded.
    #[instrument(skip(self))]
    pub async fn transcribe_video(&self, video_id: &str, cleanup_audio_file: bool) -> Result<TranscriptData> {
        validate_id(video_id)?;

        let audio_path = download_audio(video_id, &self.store.audio_dir(), self.download_timeout).await?;
        let result = self.transcriber.transcribe(&audio_path).await;

        if cleanup_audio_file {
            if let Err(e) = cleanup_audio(&audio_path) {
                warn!("Failed to remove audio file {}: {}", audio_path.display(), e);
            }
        }

        let transcript = TranscriptData::from_segments(video_id, result?);
        self.save_transcript(&transcript)?;

        info!(
            "Transcribed {} into {} segments ({:.0}s)",
            video_id,
            transcript.transcript.len(),
            transcript.duration_seconds()
        );
        Ok(transcript)
    }

    /// Stored transcript, if the video was transcribed before.
    pub fn load_transcript(&self, video_id: &str) -> Result<Option<TranscriptData>> {
        self.store.read(Collection::Transcripts, video_id)
    }

    pub fn save_transcript(&self, transcript: &TranscriptData) -> Result<()> {
        self.store
            .write(Collection::Transcripts, &transcript.video_id, transcript)?;
        Ok(())
    }

    pub fn has_transcript(&self, video_id: &str) -> Result<bool> {
        self.store.exists(Collection::Transcripts, video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StudError;
    use crate::transcription::TranscriptChunk;
    use async_trait::async_trait;
    use std::path::Path;

    struct FakeTranscriber {
        fail: bool,
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, _audio_path: &Path) -> Result<Vec<TranscriptChunk>> {
            if self.fail {
                return Err(StudError::Transcription("boom".to_string()));
            }
            Ok(vec![
                TranscriptChunk::new(0.0, 3.0, " Welcome to the course. "),
                TranscriptChunk::new(3.0, 7.0, "Today we cover ownership."),
            ])
        }
    }

    fn service(dir: &Path, fail: bool) -> TranscriptionService {
        TranscriptionService::new(
            Arc::new(FakeTranscriber { fail }),
            JsonStore::new(dir),
            Duration::from_secs(5),
        )
    }

    fn seed_audio(dir: &Path, video_id: &str) -> std::path::PathBuf {
        let audio_dir = dir.join("audio");
        std::fs::create_dir_all(&audio_dir).unwrap();
        let path = audio_dir.join(format!("{}.mp3", video_id));
        std::fs::write(&path, b"id3").unwrap();
        path
    }

    #[tokio::test]
    async fn test_transcribe_video_saves_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let audio = seed_audio(dir.path(), "vid1");
        let svc = service(dir.path(), false);

        let transcript = svc.transcribe_video("vid1", true).await.unwrap();
        assert_eq!(transcript.transcript.len(), 2);
        assert_eq!(transcript.transcript[0].text, "Welcome to the course.");
        assert!(!audio.exists());

        let loaded = svc.load_transcript("vid1").unwrap().unwrap();
        assert_eq!(loaded, transcript);
        assert!(svc.has_transcript("vid1").unwrap());
    }

    #[tokio::test]
    async fn test_transcribe_video_keeps_audio_without_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let audio = seed_audio(dir.path(), "vid2");
        let svc = service(dir.path(), false);

        svc.transcribe_video("vid2", false).await.unwrap();
        assert!(audio.exists());
    }

    #[tokio::test]
    async fn test_failed_transcription_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let audio = seed_audio(dir.path(), "vid3");
        let svc = service(dir.path(), true);

        let err = svc.transcribe_video("vid3", true).await.unwrap_err();
        assert!(matches!(err, StudError::Transcription(_)));
        assert!(!audio.exists());
        assert!(svc.load_transcript("vid3").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_bad_video_id() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), false);
        let err = svc.transcribe_video("../../etc", true).await.unwrap_err();
        assert!(err.is_invalid_input());
    }
}
