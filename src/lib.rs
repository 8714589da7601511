//! STUD - course videos into a study assistant
//!
//! Turns a YouTube playlist into a searchable study corpus with an AI tutor
//! and generated quizzes.
//!
//! # Overview
//!
//! STUD allows you to:
//! - Ingest playlist metadata from the YouTube Data API
//! - Transcribe videos with Whisper and split transcripts into token-bounded chunks
//! - Embed chunks and search them semantically
//! - Ask a tutor grounded in the transcripts, with per-session history
//! - Generate, validate and grade multiple-choice quizzes
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `storage` - JSON document store under the storage root
//! - `ingest` - Playlist ingestion
//! - `audio` - Audio download and splitting
//! - `transcription` - Speech-to-text transcription
//! - `chunking` - Token-bounded transcript chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Embedded chunk storage and similarity search
//! - `tutor` - Retrieval-augmented question answering
//! - `quiz` - Quiz generation and grading
//! - `jobs` - Background job tracking
//! - `orchestrator` - Pipeline coordination
//! - `server` - HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use stud::config::Settings;
//! use stud::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     orchestrator.transcribe_video("dQw4w9WgXcQ", None).await?;
//!     let chunks = orchestrator.embed_video("dQw4w9WgXcQ").await?;
//!     println!("Embedded {} chunks", chunks.len());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod jobs;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod quiz;
pub mod server;
pub mod storage;
pub mod transcription;
pub mod tutor;
pub mod vector_store;

pub use error::{Result, StudError};
