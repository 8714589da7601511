//! CLI module for STUD.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// STUD - video course backend
///
/// Ingests YouTube playlists, transcribes them with Whisper, embeds the
/// transcripts and serves an AI tutor and quizzes over HTTP.
#[derive(Parser, Debug)]
#[command(name = "stud")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ingest a YouTube playlist
    Ingest {
        /// Playlist URL (must carry a `list=` parameter)
        url: String,

        /// Course title to store instead of the playlist title
        #[arg(short, long)]
        title: Option<String>,

        /// Transcribe and embed every video afterwards
        #[arg(long)]
        transcribe: bool,
    },

    /// Download and transcribe a video
    Transcribe {
        /// YouTube video ID
        video_id: String,

        /// Keep the downloaded audio file
        #[arg(long)]
        keep_audio: bool,

        /// Generate embeddings once the transcript is stored
        #[arg(short, long)]
        embed: bool,

        /// Transcribe again even if a transcript exists
        #[arg(short, long)]
        force: bool,
    },

    /// Chunk and embed a stored transcript
    Embed {
        /// YouTube video ID
        video_id: String,
    },

    /// Search transcript chunks semantically
    Search {
        /// Search query
        query: String,

        /// Restrict the search to one video
        #[arg(long)]
        video: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Ask the tutor a question about the video content
    Ask {
        /// The question to ask
        question: String,

        /// Restrict retrieval to one video
        #[arg(long)]
        video: Option<String>,

        /// Continue a conversation session
        #[arg(short, long)]
        session: Option<String>,

        /// Number of transcript chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Generate or show the quiz of a video
    Quiz {
        /// YouTube video ID
        video_id: String,

        /// Number of questions to generate
        #[arg(short = 'n', long)]
        questions: Option<usize>,

        /// beginner, intermediate, advanced or mixed
        #[arg(short, long, default_value = "mixed")]
        difficulty: String,

        /// Generate a new quiz even if one exists
        #[arg(short, long)]
        regenerate: bool,

        /// Show correct answers and explanations
        #[arg(short, long)]
        answers: bool,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "tutor.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}
