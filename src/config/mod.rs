//! Configuration module for STUD.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, QuizPrompts, TutorPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, OpenAISettings, PromptSettings,
    QuizSettings, ServerSettings, Settings, TranscriptionSettings, TutorSettings,
    YoutubeSettings,
};
