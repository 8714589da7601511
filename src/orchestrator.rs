//! Pipeline orchestrator for STUD.
//!
//! Owns every service and coordinates the video pipeline from playlist
//! ingestion through transcription and chunking to stored embeddings.

use crate::chunking::{average_tokens, ChunkingService};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, StudError};
use crate::ingest::{
    extract_playlist_id, list_playlists, load_playlist, IngestService, PlaylistData,
    PlaylistSummary, YoutubeClient,
};
use crate::jobs::{JobKind, JobTracker};
use crate::llm::{ChatModel, OpenAIChat};
use crate::openai::client_from_settings;
use crate::quiz::QuizService;
use crate::storage::{validate_id, JsonStore};
use crate::transcription::{Transcriber, TranscriptData, TranscriptionService, WhisperTranscriber};
use crate::tutor::{ConversationStore, TutorService};
use crate::vector_store::{EmbeddedChunk, JsonVectorStore, SearchOutcome, VectorStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// External backends the orchestrator is built from.
pub struct Components {
    pub transcriber: Arc<dyn Transcriber>,
    pub embedder: Arc<dyn Embedder>,
    pub vector_store: Arc<dyn VectorStore>,
    pub chat: Arc<dyn ChatModel>,
    /// `None` disables playlist ingestion.
    pub youtube: Option<YoutubeClient>,
}

/// Outcome of running the pipeline over a playlist.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaylistRunReport {
    pub playlist_id: String,
    pub transcribed: usize,
    pub embedded: usize,
    pub failed: Vec<VideoFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoFailure {
    pub video_id: String,
    pub error: String,
}

impl VideoFailure {
    fn busy(video_id: &str, kind: JobKind) -> Self {
        Self {
            video_id: video_id.to_string(),
            error: format!("{} already in progress", kind),
        }
    }
}

/// The main orchestrator for the STUD pipeline.
pub struct Orchestrator {
    settings: Settings,
    store: JsonStore,
    ingest: Option<IngestService>,
    transcription: TranscriptionService,
    chunker: ChunkingService,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    tutor: TutorService,
    quizzes: QuizService,
    jobs: JobTracker,
}

impl Orchestrator {
    /// Create an orchestrator backed by OpenAI, YouTube and JSON files under
    /// the configured storage path.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let client = client_from_settings(&settings)?;
        let store = JsonStore::new(settings.storage_path());

        let youtube = match YoutubeClient::from_settings(&settings.youtube) {
            Ok(client) => Some(client),
            Err(e) => {
                debug!("Playlist ingestion unavailable: {}", e);
                None
            }
        };

        let components = Components {
            transcriber: Arc::new(WhisperTranscriber::new(
                client.clone(),
                &settings.transcription,
            )),
            embedder: Arc::new(OpenAIEmbedder::new(client.clone(), &settings.embedding)),
            vector_store: Arc::new(JsonVectorStore::new(store.clone())),
            chat: Arc::new(OpenAIChat::new(client)),
            youtube,
        };

        Self::with_components(settings, prompts, components)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        components: Components,
    ) -> Result<Self> {
        let store = JsonStore::new(settings.storage_path());
        std::fs::create_dir_all(store.root())?;

        let prompts = Arc::new(prompts);
        let chunker = ChunkingService::new(settings.chunking.max_tokens)?;

        let ingest = components
            .youtube
            .map(|client| IngestService::new(client, store.clone(), settings.youtube.max_results));

        let transcription = TranscriptionService::new(
            components.transcriber,
            store.clone(),
            settings.download_timeout(),
        );

        let tutor = TutorService::new(
            components.embedder.clone(),
            components.vector_store.clone(),
            components.chat.clone(),
            ConversationStore::new(store.clone()),
            prompts.clone(),
            settings.tutor.clone(),
        );

        let quizzes = QuizService::new(
            components.chat,
            components.vector_store.clone(),
            store.clone(),
            prompts,
            settings.quiz.clone(),
        );

        Ok(Self {
            settings,
            store,
            ingest,
            transcription,
            chunker,
            embedder: components.embedder,
            vector_store: components.vector_store,
            tutor,
            quizzes,
            jobs: JobTracker::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    pub fn jobs(&self) -> &JobTracker {
        &self.jobs
    }

    pub fn transcription(&self) -> &TranscriptionService {
        &self.transcription
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    pub fn tutor(&self) -> &TutorService {
        &self.tutor
    }

    pub fn quizzes(&self) -> &QuizService {
        &self.quizzes
    }

    /// Fetch a playlist from YouTube and store it.
    pub async fn ingest_playlist(
        &self,
        playlist_url: &str,
        course_title: Option<&str>,
    ) -> Result<PlaylistData> {
        // Reject malformed URLs before complaining about a missing API key.
        extract_playlist_id(playlist_url)?;

        let ingest = self.ingest.as_ref().ok_or_else(|| {
            StudError::Config("YOUTUBE_API_KEY not set; playlist ingestion is unavailable".to_string())
        })?;
        ingest.ingest_playlist(playlist_url, course_title).await
    }

    pub fn playlists(&self) -> Result<Vec<PlaylistSummary>> {
        list_playlists(&self.store)
    }

    /// A stored playlist; `NotFound` if it was never ingested.
    pub fn playlist(&self, playlist_id: &str) -> Result<PlaylistData> {
        load_playlist(&self.store, playlist_id)?
            .ok_or_else(|| StudError::NotFound(format!("Playlist not found: {}", playlist_id)))
    }

    /// Download and transcribe a video. `cleanup_audio` defaults to the configured value.
    pub async fn transcribe_video(
        &self,
        video_id: &str,
        cleanup_audio: Option<bool>,
    ) -> Result<TranscriptData> {
        let cleanup = cleanup_audio.unwrap_or(self.settings.transcription.cleanup_audio);
        self.transcription.transcribe_video(video_id, cleanup).await
    }

    /// Stored transcript; `NotFound` if the video was not transcribed.
    pub fn transcript(&self, video_id: &str) -> Result<TranscriptData> {
        self.transcription
            .load_transcript(video_id)?
            .ok_or_else(|| {
                StudError::NotFound(format!("Transcript not found for video: {}", video_id))
            })
    }

    /// Chunk a stored transcript, embed every chunk and save the result.
    #[instrument(skip(self))]
    pub async fn embed_video(&self, video_id: &str) -> Result<Vec<EmbeddedChunk>> {
        let transcript = self.transcript(video_id)?;

        let chunks = self.chunker.chunk_transcript(&transcript);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_batch(&texts).await?
        };

        if embeddings.len() != chunks.len() {
            return Err(StudError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let total_tokens: usize = chunks.iter().map(|c| c.tokens).sum();
        let avg = average_tokens(&chunks);

        let embedded: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk::new(chunk, embedding))
            .collect();

        self.vector_store.save_video(video_id, &embedded).await?;

        info!(
            "Embedded {} chunks for {} ({} tokens, {:.1} avg)",
            embedded.len(),
            video_id,
            total_tokens,
            avg
        );
        Ok(embedded)
    }

    /// Stored chunks of a video; `NotFound` without embeddings.
    pub async fn embedded_chunks(&self, video_id: &str) -> Result<Vec<EmbeddedChunk>> {
        validate_id(video_id)?;
        self.vector_store.chunks_for(video_id).await?.ok_or_else(|| {
            StudError::NotFound(format!("Embeddings not found for video: {}", video_id))
        })
    }

    /// Semantic search over stored chunks.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        video_id: Option<&str>,
        top_k: usize,
    ) -> Result<SearchOutcome> {
        if query.trim().is_empty() {
            return Err(StudError::InvalidInput("Query must not be empty".to_string()));
        }
        if let Some(id) = video_id {
            validate_id(id)?;
        }
        if !self.vector_store.has_any().await? {
            return Ok(SearchOutcome::default());
        }

        let query_embedding = self.embedder.embed(query).await?;
        self.vector_store.search(&query_embedding, video_id, top_k).await
    }

    /// Transcribe then embed every video of a playlist, one at a time.
    ///
    /// A failing video is logged, recorded in the job tracker and skipped.
    /// Videos that already have a transcript are not transcribed again, and
    /// videos with a job already running elsewhere are left to that job.
    #[instrument(skip(self, playlist), fields(playlist_id = %playlist.playlist_id))]
    pub async fn process_playlist(&self, playlist: &PlaylistData) -> PlaylistRunReport {
        let mut report = PlaylistRunReport {
            playlist_id: playlist.playlist_id.clone(),
            ..Default::default()
        };

        for video in &playlist.videos {
            let id = video.video_id.as_str();

            match self.transcription.has_transcript(id) {
                Ok(true) => debug!("Transcript for {} exists", id),
                _ => {
                    if !self.jobs.start(JobKind::Transcription, id).await {
                        report.failed.push(VideoFailure::busy(id, JobKind::Transcription));
                        continue;
                    }
                    match self.transcribe_video(id, None).await {
                        Ok(_) => {
                            self.jobs.complete(JobKind::Transcription, id).await;
                            report.transcribed += 1;
                        }
                        Err(e) => {
                            warn!("Transcription of {} failed: {}", id, e);
                            self.jobs.fail(JobKind::Transcription, id, e.to_string()).await;
                            report.failed.push(VideoFailure {
                                video_id: id.to_string(),
                                error: e.to_string(),
                            });
                            continue;
                        }
                    }
                }
            }

            if !self.jobs.start(JobKind::Embedding, id).await {
                report.failed.push(VideoFailure::busy(id, JobKind::Embedding));
                continue;
            }
            match self.embed_video(id).await {
                Ok(_) => {
                    self.jobs.complete(JobKind::Embedding, id).await;
                    report.embedded += 1;
                }
                Err(e) => {
                    warn!("Embedding of {} failed: {}", id, e);
                    self.jobs.fail(JobKind::Embedding, id, e.to_string()).await;
                    report.failed.push(VideoFailure {
                        video_id: id.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Playlist run finished: {} transcribed, {} embedded, {} failed",
            report.transcribed,
            report.embedded,
            report.failed.len()
        );
        report
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::llm::ScriptedChat;
    use crate::transcription::TranscriptChunk;
    use crate::tutor::testing::FixedEmbedder;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;
    use std::path::Path;

    /// Returns the same segments for any audio file.
    pub struct CannedTranscriber(pub Vec<TranscriptChunk>);

    #[async_trait]
    impl Transcriber for CannedTranscriber {
        async fn transcribe(&self, _audio_path: &Path) -> Result<Vec<TranscriptChunk>> {
            Ok(self.0.clone())
        }
    }

    pub fn settings_in(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.storage_path = dir.to_string_lossy().to_string();
        settings.transcription.cleanup_audio = false;
        settings
    }

    /// Orchestrator over in-memory fakes, storing files under `dir`.
    pub fn orchestrator(dir: &Path, chat: ScriptedChat) -> Orchestrator {
        let components = Components {
            transcriber: Arc::new(CannedTranscriber(vec![
                TranscriptChunk::new(0.0, 4.0, "Ownership moves values."),
                TranscriptChunk::new(4.0, 9.0, "Borrowing lends them."),
            ])),
            embedder: Arc::new(FixedEmbedder(vec![0.6, 0.8])),
            vector_store: Arc::new(MemoryVectorStore::new()),
            chat: Arc::new(chat),
            youtube: None,
        };
        Orchestrator::with_components(settings_in(dir), Prompts::default(), components)
            .expect("orchestrator")
    }

    /// Place a fake downloaded audio file so no download is attempted.
    pub fn seed_audio(orchestrator: &Orchestrator, video_id: &str) {
        let dir = orchestrator.store().audio_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{}.mp3", video_id)), b"mp3").unwrap();
    }
}
