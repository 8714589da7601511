//! STUD CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use stud::cli::{commands, Cli, Commands};
use stud::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // -v flags win over the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("stud={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.storage_path())?;

    match cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host, port, settings).await?;
        }

        Commands::Ingest { url, title, transcribe } => {
            commands::run_ingest(&url, title, transcribe, settings).await?;
        }

        Commands::Transcribe {
            video_id,
            keep_audio,
            embed,
            force,
        } => {
            commands::run_transcribe(&video_id, keep_audio, embed, force, settings).await?;
        }

        Commands::Embed { video_id } => {
            commands::run_embed(&video_id, settings).await?;
        }

        Commands::Search { query, video, limit } => {
            commands::run_search(&query, video, limit, settings).await?;
        }

        Commands::Ask {
            question,
            video,
            session,
            top_k,
        } => {
            commands::run_ask(&question, video, session, top_k, settings).await?;
        }

        Commands::Quiz {
            video_id,
            questions,
            difficulty,
            regenerate,
            answers,
        } => {
            commands::run_quiz(&video_id, questions, &difficulty, regenerate, answers, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, config_path.as_ref())?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, config_path.as_ref(), settings)?;
        }
    }

    Ok(())
}
