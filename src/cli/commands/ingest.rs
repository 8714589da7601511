//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(
    url: &str,
    title: Option<String>,
    transcribe: bool,
    settings: Settings,
) -> Result<()> {
    let mut required = vec![Operation::Ingest];
    if transcribe {
        required.push(Operation::Transcribe);
    }
    for operation in required {
        if let Err(e) = preflight::check(operation, &settings) {
            Output::error(&format!("{}", e));
            Output::info("Run 'stud doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Fetching playlist...");
    let result = orchestrator.ingest_playlist(url, title.as_deref()).await;
    spinner.finish_and_clear();

    let playlist = match result {
        Ok(p) => p,
        Err(e) => {
            Output::error(&format!("Failed to ingest playlist: {}", e));
            return Err(e.into());
        }
    };

    Output::success(&format!(
        "Ingested '{}' ({} videos)",
        playlist.title,
        playlist.videos.len()
    ));
    Output::kv("Playlist ID", &playlist.playlist_id);
    if let Some(channel) = &playlist.channel_title {
        Output::kv("Channel", channel);
    }
    println!();
    for video in &playlist.videos {
        Output::video_info(&video.title, &video.video_id, video.duration_seconds);
    }

    if transcribe {
        println!();
        Output::info(&format!(
            "Transcribing and embedding {} videos...",
            playlist.videos.len()
        ));
        let spinner = Output::spinner("Processing playlist (this can take a while)...");
        let report = orchestrator.process_playlist(&playlist).await;
        spinner.finish_and_clear();

        Output::info(&format!(
            "Playlist complete: {} transcribed, {} embedded, {} failed",
            report.transcribed,
            report.embedded,
            report.failed.len()
        ));
        for failure in &report.failed {
            Output::warning(&format!("{}: {}", failure.video_id, failure.error));
        }
    }

    Ok(())
}
