//! Request handlers for the `/api/v1` routes.

use super::error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use super::AppState;
use crate::chunking::average_tokens;
use crate::error::StudError;
use crate::ingest::{PlaylistData, PlaylistSummary};
use crate::jobs::{JobKind, JobState};
use crate::quiz::{AnswerResult, QuizService, QuizView, ValidationReport};
use crate::storage::validate_id;
use crate::transcription::TranscriptData;
use crate::tutor::{starter_questions, AskRequest, HistoryEntry, SessionStats, TutorResponse};
use crate::vector_store::{ChunkMatch, EmbeddedChunk};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

// === Service info ===

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "stud-backend",
    }))
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "STUD API - Studying Till Unlocking Dreams",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
        "api": "/api/v1",
    }))
}

/// Status of a job that has not produced its output file.
fn pending_status(job: Option<JobState>, running: &str) -> (String, Option<String>) {
    match job {
        Some(state) if state.is_running() => (running.to_string(), None),
        Some(state) => match state.error() {
            Some(e) => ("error".to_string(), Some(e.to_string())),
            None => ("not_started".to_string(), None),
        },
        None => ("not_started".to_string(), None),
    }
}

// === Ingestion ===

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub playlist_url: String,
    #[serde(default)]
    pub course_title: Option<String>,
    /// Queue transcription and embedding of every video.
    #[serde(default)]
    pub auto_transcribe: bool,
}

pub async fn ingest_playlist(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<IngestRequest>,
) -> ApiResult<(StatusCode, Json<PlaylistData>)> {
    let playlist = state
        .orchestrator
        .ingest_playlist(&req.playlist_url, req.course_title.as_deref())
        .await?;

    if req.auto_transcribe {
        let orchestrator = state.orchestrator.clone();
        let queued = playlist.clone();
        state
            .orchestrator
            .jobs()
            .spawn(JobKind::Playlist, &playlist.playlist_id, async move {
                let report = orchestrator.process_playlist(&queued).await;
                if !queued.videos.is_empty() && report.failed.len() == queued.videos.len() {
                    return Err(StudError::Transcription(format!(
                        "All {} videos failed",
                        report.failed.len()
                    )));
                }
                Ok(())
            })
            .await;
        info!(
            "Queued transcription of {} videos from {}",
            playlist.videos.len(),
            playlist.playlist_id
        );
    }

    Ok((StatusCode::CREATED, Json(playlist)))
}

#[derive(Serialize)]
pub struct PlaylistList {
    pub playlists: Vec<PlaylistSummary>,
    pub total: usize,
}

pub async fn list_playlists(State(state): State<AppState>) -> ApiResult<Json<PlaylistList>> {
    let playlists = state.orchestrator.playlists()?;
    Ok(Json(PlaylistList {
        total: playlists.len(),
        playlists,
    }))
}

pub async fn get_playlist(
    State(state): State<AppState>,
    ApiPath(playlist_id): ApiPath<String>,
) -> ApiResult<Json<PlaylistData>> {
    Ok(Json(state.orchestrator.playlist(&playlist_id)?))
}

// === Transcription ===

#[derive(Debug, Deserialize)]
pub struct TranscribeQuery {
    #[serde(default)]
    pub cleanup_audio: Option<bool>,
}

pub async fn transcribe_video(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<TranscribeQuery>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate_id(&video_id)?;

    if let Some(existing) = state.orchestrator.transcription().load_transcript(&video_id)? {
        return Ok((
            StatusCode::ACCEPTED,
            Json(json!({
                "video_id": video_id,
                "status": "completed",
                "message": "Transcript already exists",
                "chunks": existing.transcript.len(),
            })),
        ));
    }

    let orchestrator = state.orchestrator.clone();
    let id = video_id.clone();
    let started = state
        .orchestrator
        .jobs()
        .spawn(JobKind::Transcription, &video_id, async move {
            orchestrator
                .transcribe_video(&id, query.cleanup_audio)
                .await
                .map(|_| ())
        })
        .await;

    let message = if started {
        "Transcription started in background"
    } else {
        "Transcription already in progress"
    };
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "video_id": video_id,
            "status": "transcribing",
            "message": message,
        })),
    ))
}

pub async fn get_transcript(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
) -> ApiResult<Json<TranscriptData>> {
    Ok(Json(state.orchestrator.transcript(&video_id)?))
}

pub async fn transcription_status(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    if let Some(transcript) = state.orchestrator.transcription().load_transcript(&video_id)? {
        return Ok(Json(json!({
            "video_id": video_id,
            "status": "completed",
            "chunks": transcript.transcript.len(),
        })));
    }

    let job = state
        .orchestrator
        .jobs()
        .get(JobKind::Transcription, &video_id)
        .await;
    let (status, error) = pending_status(job, "transcribing");
    let mut body = json!({ "video_id": video_id, "status": status });
    if let Some(e) = error {
        body["error"] = json!(e);
    }
    if status == "not_started" {
        body["message"] = json!(format!(
            "Transcript not found. Call POST /api/v1/transcribe/video/{} to start transcription.",
            video_id
        ));
    }
    Ok(Json(body))
}

// === Embeddings ===

pub async fn embed_video(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate_id(&video_id)?;

    let orchestrator = state.orchestrator.clone();
    let id = video_id.clone();
    let started = state
        .orchestrator
        .jobs()
        .spawn(JobKind::Embedding, &video_id, async move {
            orchestrator.embed_video(&id).await.map(|_| ())
        })
        .await;

    let message = if started {
        "Embedding generation started in background"
    } else {
        "Embedding generation already in progress"
    };
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "processing",
            "video_id": video_id,
            "message": message,
        })),
    ))
}

#[derive(Serialize)]
pub struct EmbeddedVideo {
    pub video_id: String,
    pub chunks: Vec<EmbeddedChunk>,
    pub total_chunks: usize,
    pub avg_tokens: f64,
}

pub async fn get_embeddings(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
) -> ApiResult<Json<EmbeddedVideo>> {
    let chunks = state.orchestrator.embedded_chunks(&video_id).await?;
    let plain: Vec<_> = chunks.iter().map(|c| c.chunk.clone()).collect();
    let avg_tokens = (average_tokens(&plain) * 10.0).round() / 10.0;

    Ok(Json(EmbeddedVideo {
        video_id,
        total_chunks: chunks.len(),
        avg_tokens,
        chunks,
    }))
}

pub async fn embedding_status(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    validate_id(&video_id)?;
    if state.orchestrator.vector_store().has_video(&video_id).await? {
        return Ok(Json(json!({ "status": "completed", "video_id": video_id })));
    }

    let job = state.orchestrator.jobs().get(JobKind::Embedding, &video_id).await;
    let (status, error) = pending_status(job, "processing");
    let mut body = json!({ "status": status, "video_id": video_id });
    if let Some(e) = error {
        body["error"] = json!(e);
    }
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ChunkMatch>,
    pub total_searched: usize,
}

pub async fn search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let outcome = state
        .orchestrator
        .search(&params.query, params.video_id.as_deref(), params.top_k)
        .await?;

    Ok(Json(SearchResponse {
        query: params.query,
        results: outcome.matches,
        total_searched: outcome.total_searched,
    }))
}

// === Quizzes ===

#[derive(Debug, Deserialize)]
pub struct QuizGenerateRequest {
    #[serde(default)]
    pub num_questions: Option<usize>,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

fn default_difficulty() -> String {
    "mixed".to_string()
}

pub async fn generate_quiz(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
    ApiJson(req): ApiJson<QuizGenerateRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate_id(&video_id)?;
    let num_questions = req
        .num_questions
        .unwrap_or(state.orchestrator.settings().quiz.questions_per_video);
    QuizService::check_request(num_questions, &req.difficulty)?;

    if !state.orchestrator.vector_store().has_video(&video_id).await? {
        return Err(ApiError(StudError::NotFound(format!(
            "Embeddings not found for video: {}. Generate embeddings first.",
            video_id
        ))));
    }

    let orchestrator = state.orchestrator.clone();
    let id = video_id.clone();
    let difficulty = req.difficulty.clone();
    state
        .orchestrator
        .jobs()
        .spawn(JobKind::Quiz, &video_id, async move {
            orchestrator
                .quizzes()
                .generate_quiz(&id, num_questions, &difficulty)
                .await
                .map(|_| ())
        })
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "processing",
            "video_id": video_id,
            "num_questions": num_questions,
            "message": "Quiz generation started in background",
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct QuizViewQuery {
    #[serde(default)]
    pub include_answers: bool,
}

pub async fn get_quiz(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<QuizViewQuery>,
) -> ApiResult<Json<QuizView>> {
    Ok(Json(
        state
            .orchestrator
            .quizzes()
            .view(&video_id, query.include_answers)?,
    ))
}

pub async fn quiz_status(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let quizzes = state.orchestrator.quizzes();
    if quizzes.has_quiz(&video_id)? {
        return Ok(Json(match quizzes.validate(&video_id) {
            Ok(report) => json!({
                "status": "completed",
                "video_id": video_id,
                "total_questions": report.total_questions,
                "needs_review": report.needs_review,
                "valid": report.valid,
            }),
            Err(e) => json!({
                "status": "error",
                "video_id": video_id,
                "error": e.to_string(),
            }),
        }));
    }

    let job = state.orchestrator.jobs().get(JobKind::Quiz, &video_id).await;
    let (status, error) = pending_status(job, "processing");
    let mut body = json!({ "status": status, "video_id": video_id });
    if let Some(e) = error {
        body["error"] = json!(e);
    }
    Ok(Json(body))
}

pub async fn validate_quiz(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
) -> ApiResult<Json<ValidationReport>> {
    Ok(Json(state.orchestrator.quizzes().validate(&video_id)?))
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuery {
    pub answer_index: i64,
}

pub async fn submit_answer(
    State(state): State<AppState>,
    ApiPath((video_id, question_id)): ApiPath<(String, usize)>,
    ApiQuery(query): ApiQuery<SubmitQuery>,
) -> ApiResult<Json<AnswerResult>> {
    Ok(Json(state.orchestrator.quizzes().submit_answer(
        &video_id,
        question_id,
        query.answer_index,
    )?))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub reviewed: bool,
    #[serde(default)]
    pub reviewer_notes: Option<String>,
}

pub async fn review_question(
    State(state): State<AppState>,
    ApiPath((video_id, question_id)): ApiPath<(String, usize)>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> ApiResult<Json<Value>> {
    let question = state.orchestrator.quizzes().mark_reviewed(
        &video_id,
        question_id,
        req.reviewed,
        req.reviewer_notes,
    )?;

    Ok(Json(json!({
        "video_id": video_id,
        "question_id": question_id,
        "requires_review": question.requires_review,
        "reviewer_notes": question.reviewer_notes,
        "message": "Review status updated",
    })))
}

// === Tutor ===

pub async fn ask(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AskRequest>,
) -> ApiResult<Json<TutorResponse>> {
    Ok(Json(state.orchestrator.tutor().ask_question(req).await?))
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub total_messages: usize,
    pub history: Vec<HistoryEntry>,
}

pub async fn get_history(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let history = state.orchestrator.tutor().conversations().history(&session_id)?;
    Ok(Json(HistoryResponse {
        session_id,
        total_messages: history.len(),
        history,
    }))
}

pub async fn clear_history(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    state.orchestrator.tutor().conversations().clear(&session_id)?;
    Ok(Json(json!({
        "session_id": session_id,
        "message": "Conversation history cleared",
    })))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub session_id: String,
    pub question_index: usize,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

pub async fn feedback(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<FeedbackRequest>,
) -> ApiResult<Json<Value>> {
    let rating = u8::try_from(req.rating)
        .map_err(|_| StudError::InvalidInput("Rating must be between 1 and 5".to_string()))?;

    state.orchestrator.tutor().conversations().record_feedback(
        &req.session_id,
        req.question_index,
        rating,
        req.comment,
    )?;

    Ok(Json(json!({
        "session_id": req.session_id,
        "question_index": req.question_index,
        "rating": rating,
        "message": "Feedback received. Thank you!",
    })))
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default = "default_suggestions")]
    pub count: usize,
}

fn default_suggestions() -> usize {
    5
}

pub async fn suggest(
    ApiPath(video_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<SuggestQuery>,
) -> Json<Value> {
    Json(json!({
        "video_id": video_id,
        "suggestions": starter_questions(query.count),
    }))
}

pub async fn stats(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<String>,
) -> ApiResult<Json<SessionStats>> {
    Ok(Json(state.orchestrator.tutor().conversations().stats(&session_id)?))
}
