//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, StudError};
use crate::openai::is_api_key_configured;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion requires a YouTube API key.
    Ingest,
    /// Transcription requires the download tools and an OpenAI key.
    Transcribe,
    /// Embedding, search, tutor and quiz calls need an OpenAI key.
    OpenAI,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest => {
            check_youtube_key(settings)?;
        }
        Operation::Transcribe => {
            check_api_key(settings)?;
            check_tool("yt-dlp")?;
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
        }
        Operation::OpenAI => {
            check_api_key(settings)?;
        }
    }
    Ok(())
}

/// Check if an OpenAI API key is configured.
fn check_api_key(settings: &Settings) -> Result<()> {
    if is_api_key_configured(settings) {
        Ok(())
    } else {
        Err(StudError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ))
    }
}

fn check_youtube_key(settings: &Settings) -> Result<()> {
    match settings.youtube.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err(StudError::Config(
            "YOUTUBE_API_KEY not set. Set it with: export YOUTUBE_API_KEY='...'".to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(StudError::ToolFailed(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(StudError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(StudError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_key_required_for_ingest() {
        let mut settings = Settings::default();
        settings.youtube.api_key = None;
        assert!(matches!(
            check(Operation::Ingest, &settings),
            Err(StudError::Config(_))
        ));

        settings.youtube.api_key = Some("AIza-test".to_string());
        assert!(check(Operation::Ingest, &settings).is_ok());
    }

    #[test]
    fn test_openai_key_from_settings() {
        let mut settings = Settings::default();
        settings.openai.api_key = Some("sk-test".to_string());
        assert!(check(Operation::OpenAI, &settings).is_ok());
    }

    #[test]
    fn test_missing_tool() {
        assert!(matches!(
            check_tool("definitely-not-a-real-tool-xyz"),
            Err(StudError::ToolNotFound(_))
        ));
    }
}
