//! HTTP API server.
//!
//! Exposes ingestion, transcription, embedding, quiz and tutor operations
//! under `/api/v1`. Long-running work is queued on the job tracker and
//! answered with `202 Accepted`.

mod error;
mod handlers;

pub use error::{ApiError, ApiResult};

use crate::config::ServerSettings;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// CORS policy from the configured origins; `*` allows any origin.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.orchestrator.settings().server.allowed_origins);

    let api = Router::new()
        // Ingestion
        .route("/ingest/playlist", post(handlers::ingest_playlist))
        .route("/ingest/playlists", get(handlers::list_playlists))
        .route("/ingest/playlist/{playlist_id}", get(handlers::get_playlist))
        // Transcription
        .route(
            "/transcribe/video/{video_id}",
            post(handlers::transcribe_video).get(handlers::get_transcript),
        )
        .route("/transcribe/status/{video_id}", get(handlers::transcription_status))
        // Embeddings
        .route(
            "/embed/video/{video_id}",
            post(handlers::embed_video).get(handlers::get_embeddings),
        )
        .route("/embed/status/{video_id}", get(handlers::embedding_status))
        .route("/embed/search", post(handlers::search))
        // Quizzes
        .route(
            "/quiz/video/{video_id}",
            post(handlers::generate_quiz).get(handlers::get_quiz),
        )
        .route("/quiz/status/{video_id}", get(handlers::quiz_status))
        .route("/quiz/video/{video_id}/validate", post(handlers::validate_quiz))
        .route(
            "/quiz/video/{video_id}/question/{question_id}/submit",
            post(handlers::submit_answer),
        )
        .route(
            "/quiz/video/{video_id}/question/{question_id}/review",
            put(handlers::review_question),
        )
        // Tutor
        .route("/tutor/ask", post(handlers::ask))
        .route(
            "/tutor/history/{session_id}",
            get(handlers::get_history).delete(handlers::clear_history),
        )
        .route("/tutor/feedback", post(handlers::feedback))
        .route("/tutor/suggest/{video_id}", get(handlers::suggest))
        .route("/tutor/stats/{session_id}", get(handlers::stats));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::root))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind and serve until Ctrl+C.
pub async fn serve(orchestrator: Arc<Orchestrator>, settings: &ServerSettings) -> Result<()> {
    let app = router(AppState::new(orchestrator));

    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedChat;
    use crate::orchestrator::testing::orchestrator;
    use crate::transcription::{TranscriptChunk, TranscriptData};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    const QUIZ_REPLY: &str = r#"{"questions": [
        {"question": "What do traits describe?", "options": ["Behaviour", "Memory", "Threads", "Macros"],
         "correct_index": 0, "explanation": "At 0s: traits describe behaviour.", "difficulty": "beginner",
         "requires_review": true, "timestamp_reference": 0.0}
    ]}"#;

    struct TestApp {
        _dir: tempfile::TempDir,
        state: AppState,
    }

    impl TestApp {
        fn new(chat: ScriptedChat) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let orchestrator = Arc::new(orchestrator(dir.path(), chat));
            Self {
                _dir: dir,
                state: AppState::new(orchestrator),
            }
        }

        fn with_transcript(self, video_id: &str) -> Self {
            self.state
                .orchestrator
                .transcription()
                .save_transcript(&TranscriptData::from_segments(
                    video_id,
                    vec![
                        TranscriptChunk::new(0.0, 3.0, "Traits describe behaviour."),
                        TranscriptChunk::new(3.0, 6.0, "Generics are bounded by traits."),
                    ],
                ))
                .unwrap();
            self
        }

        async fn with_embeddings(self, video_id: &str) -> Self {
            let app = self.with_transcript(video_id);
            app.state.orchestrator.embed_video(video_id).await.unwrap();
            app
        }

        async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            match body {
                Some(json) => self.call_raw(method, uri, &json.to_string()).await,
                None => self.send(Request::builder().method(method).uri(uri), Body::empty()).await,
            }
        }

        /// Send `body` verbatim as `application/json`.
        async fn call_raw(&self, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json");
            self.send(request, Body::from(body.to_string())).await
        }

        async fn send(&self, request: axum::http::request::Builder, body: Body) -> (StatusCode, Value) {
            let response = router(self.state.clone())
                .oneshot(request.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }

        async fn wait_for(&self, uri: &str, pending: &str) -> Value {
            for _ in 0..200 {
                let (_, body) = self.call("GET", uri, None).await;
                if body["status"] != pending {
                    return body;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            panic!("{} stayed {}", uri, pending);
        }
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let app = TestApp::new(ScriptedChat::new(vec![]));

        let (status, body) = app.call("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "stud-backend");
        assert_eq!(body["version"], "0.1.0");

        let (status, body) = app.call("GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["health"], "/health");
    }

    #[tokio::test]
    async fn test_ingest_errors() {
        let app = TestApp::new(ScriptedChat::new(vec![]));

        let (status, body) = app
            .call(
                "POST",
                "/api/v1/ingest/playlist",
                Some(serde_json::json!({ "playlist_url": "https://example.com/watch?v=1" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("playlist"));

        let (status, _) = app.call("GET", "/api/v1/ingest/playlist/PLmissing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app.call("GET", "/api/v1/ingest/playlists", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn test_transcription_routes() {
        let app = TestApp::new(ScriptedChat::new(vec![]));

        let (status, _) = app.call("GET", "/api/v1/transcribe/video/vid", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = app.call("GET", "/api/v1/transcribe/status/vid", None).await;
        assert_eq!(body["status"], "not_started");

        let (status, _) = app.call("GET", "/api/v1/transcribe/status/bad.id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let app = app.with_transcript("vid");
        let (status, body) = app.call("POST", "/api/v1/transcribe/video/vid", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["chunks"], 2);

        let (status, body) = app.call("GET", "/api/v1/transcribe/video/vid", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transcript"][1]["text"], "Generics are bounded by traits.");
    }

    #[tokio::test]
    async fn test_failed_job_reports_error() {
        let app = TestApp::new(ScriptedChat::new(vec![]));
        let (status, body) = app.call("POST", "/api/v1/embed/video/novideo", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "processing");

        let body = app.wait_for("/api/v1/embed/status/novideo", "processing").await;
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("Transcript not found"));
    }

    #[tokio::test]
    async fn test_embedding_routes() {
        let app = TestApp::new(ScriptedChat::new(vec![])).with_transcript("vid");

        let (status, _) = app.call("GET", "/api/v1/embed/video/vid", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.call("POST", "/api/v1/embed/video/vid", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let body = app.wait_for("/api/v1/embed/status/vid", "processing").await;
        assert_eq!(body["status"], "completed");

        let (status, body) = app.call("GET", "/api/v1/embed/video/vid", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_chunks"], 1);
        assert!(body["avg_tokens"].as_f64().unwrap() > 0.0);
        assert_eq!(body["chunks"][0]["chunk_index"], 0);

        let (status, body) = app
            .call("POST", "/api/v1/embed/search?query=traits&video_id=vid&top_k=3", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "traits");
        assert_eq!(body["total_searched"], 1);
        assert_eq!(body["results"][0]["video_id"], "vid");
    }

    #[tokio::test]
    async fn test_quiz_routes() {
        let app = TestApp::new(ScriptedChat::replying(QUIZ_REPLY));

        let (status, _) = app
            .call("POST", "/api/v1/quiz/video/vid", Some(serde_json::json!({})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let app = app.with_embeddings("vid").await;

        let (status, _) = app
            .call(
                "POST",
                "/api/v1/quiz/video/vid",
                Some(serde_json::json!({ "difficulty": "expert" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .call(
                "POST",
                "/api/v1/quiz/video/vid",
                Some(serde_json::json!({ "num_questions": 1 })),
            )
            .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["num_questions"], 1);

        let body = app.wait_for("/api/v1/quiz/status/vid", "processing").await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["total_questions"], 1);
        assert_eq!(body["needs_review"], 1);

        let (_, student) = app.call("GET", "/api/v1/quiz/video/vid", None).await;
        assert!(student["questions"][0].get("correct_index").is_none());
        let (_, instructor) = app
            .call("GET", "/api/v1/quiz/video/vid?include_answers=true", None)
            .await;
        assert_eq!(instructor["questions"][0]["correct_index"], 0);

        let (status, body) = app
            .call("POST", "/api/v1/quiz/video/vid/question/0/submit?answer_index=0", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["correct"], true);

        let (status, _) = app
            .call("POST", "/api/v1/quiz/video/vid/question/5/submit?answer_index=0", None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .call(
                "PUT",
                "/api/v1/quiz/video/vid/question/0/review",
                Some(serde_json::json!({ "reviewed": true, "reviewer_notes": "ok" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requires_review"], false);

        let (status, body) = app.call("POST", "/api/v1/quiz/video/vid/validate", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["needs_review"], 0);
        assert_eq!(body["valid"], true);
    }

    #[tokio::test]
    async fn test_tutor_routes() {
        let app = TestApp::new(ScriptedChat::replying(
            "Traits describe shared behaviour [Video: vid at 0.0s].",
        ))
        .with_embeddings("vid")
        .await;

        let (status, _) = app
            .call("POST", "/api/v1/tutor/ask", Some(serde_json::json!({ "question": "hi" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .call(
                "POST",
                "/api/v1/tutor/ask",
                Some(serde_json::json!({ "question": "What are traits?", "session_id": "s1" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], "s1");
        assert_eq!(body["sources"][0]["video_id"], "vid");

        let (_, body) = app.call("GET", "/api/v1/tutor/history/s1", None).await;
        assert_eq!(body["total_messages"], 1);

        let (status, body) = app.call("GET", "/api/v1/tutor/stats/s1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_questions"], 1);

        let (status, _) = app
            .call(
                "POST",
                "/api/v1/tutor/feedback",
                Some(serde_json::json!({ "session_id": "s1", "question_index": 0, "rating": 6 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .call(
                "POST",
                "/api/v1/tutor/feedback",
                Some(serde_json::json!({ "session_id": "s1", "question_index": 0, "rating": 4 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rating"], 4);

        let (status, _) = app.call("DELETE", "/api/v1/tutor/history/s1", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.call("GET", "/api/v1/tutor/stats/s1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = app.call("GET", "/api/v1/tutor/suggest/vid?count=20", None).await;
        assert_eq!(body["suggestions"].as_array().unwrap().len(), 10);
        let (_, body) = app.call("GET", "/api/v1/tutor/suggest/vid", None).await;
        assert_eq!(body["suggestions"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_extractor_rejections_are_json() {
        let app = TestApp::new(ScriptedChat::new(vec![])).with_embeddings("vid").await;

        let cases = [
            ("POST", "/api/v1/embed/search", None),
            ("POST", "/api/v1/embed/search?query=x&top_k=many", None),
            ("POST", "/api/v1/quiz/video/vid/question/0/submit", None),
            ("POST", "/api/v1/quiz/video/vid/question/-1/submit?answer_index=0", None),
            ("POST", "/api/v1/tutor/ask", Some("{not json")),
            ("POST", "/api/v1/tutor/ask", Some(r#"{"session_id": "s"}"#)),
            ("POST", "/api/v1/tutor/feedback", Some(r#"{"session_id": "s", "question_index": 0, "rating": "high"}"#)),
        ];

        for (method, uri, body) in cases {
            let (status, json) = match body {
                Some(raw) => app.call_raw(method, uri, raw).await,
                None => app.call(method, uri, None).await,
            };
            assert!(status.is_client_error(), "{} {} gave {}", method, uri, status);
            assert!(
                json["error"].as_str().is_some_and(|e| !e.is_empty()),
                "{} {} body {:?}",
                method,
                uri,
                json
            );
        }
    }

    #[test]
    fn test_cors_accepts_wildcard_and_lists() {
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["http://localhost:3000".to_string(), "bad\norigin".to_string()]);
    }
}
