//! Transcribe and embed command implementations.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the transcribe command.
pub async fn run_transcribe(
    video_id: &str,
    keep_audio: bool,
    embed: bool,
    force: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Transcribe, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'stud doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let existing = orchestrator.transcription().load_transcript(video_id)?;
    match existing {
        Some(transcript) if !force => {
            Output::warning(&format!(
                "Transcript for {} already exists ({} segments). Use --force to redo it.",
                video_id,
                transcript.transcript.len()
            ));
        }
        _ => {
            Output::info(&format!("Transcribing: {}", video_id));
            let spinner = Output::spinner("Downloading and transcribing...");
            let cleanup = if keep_audio { Some(false) } else { None };
            let result = orchestrator.transcribe_video(video_id, cleanup).await;
            spinner.finish_and_clear();

            match result {
                Ok(transcript) => Output::success(&format!(
                    "Transcribed {} ({} segments, {:.0}s)",
                    video_id,
                    transcript.transcript.len(),
                    transcript.duration_seconds()
                )),
                Err(e) => {
                    Output::error(&format!("Failed to transcribe: {}", e));
                    return Err(e.into());
                }
            }
        }
    }

    if embed {
        embed_with_spinner(&orchestrator, video_id).await?;
    }

    Ok(())
}

/// Run the embed command.
pub async fn run_embed(video_id: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::OpenAI, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    embed_with_spinner(&orchestrator, video_id).await
}

async fn embed_with_spinner(orchestrator: &Orchestrator, video_id: &str) -> Result<()> {
    let spinner = Output::spinner("Chunking and embedding...");
    let result = orchestrator.embed_video(video_id).await;
    spinner.finish_and_clear();

    match result {
        Ok(chunks) => {
            let tokens: usize = chunks.iter().map(|c| c.chunk.tokens).sum();
            Output::success(&format!(
                "Embedded {} chunks ({} tokens) for {}",
                chunks.len(),
                tokens,
                video_id
            ));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to embed: {}", e));
            Err(e.into())
        }
    }
}
