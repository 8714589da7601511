//! Serve command: run the HTTP API.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::server;
use std::sync::Arc;

/// Run the HTTP API server. Flags override the configured host and port.
pub async fn run_serve(host: Option<String>, port: Option<u16>, mut settings: Settings) -> anyhow::Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    let server_settings = settings.server.clone();

    let orchestrator = Arc::new(Orchestrator::new(settings)?);

    Output::header("STUD API Server");
    println!();
    Output::success(&format!(
        "Listening on http://{}:{}",
        server_settings.host, server_settings.port
    ));
    println!();
    println!("Endpoints (under /api/v1):");
    Output::kv("Ingest", "POST /ingest/playlist, GET /ingest/playlists");
    Output::kv("Transcribe", "POST|GET /transcribe/video/{video_id}");
    Output::kv("Embed", "POST|GET /embed/video/{video_id}, POST /embed/search");
    Output::kv("Quiz", "POST|GET /quiz/video/{video_id}");
    Output::kv("Tutor", "POST /tutor/ask, GET /tutor/history/{session_id}");
    if !orchestrator.settings().youtube.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
        Output::warning("YOUTUBE_API_KEY not set; playlist ingestion will fail.");
    }
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    server::serve(orchestrator, &server_settings).await?;

    Ok(())
}
