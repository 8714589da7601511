//! Configuration settings for STUD.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub youtube: YoutubeSettings,
    pub openai: OpenAISettings,
    pub transcription: TranscriptionSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub tutor: TutorSettings,
    pub quiz: QuizSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Root directory for playlists, transcripts, embeddings, quizzes and conversations.
    pub storage_path: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            storage_path: "~/.stud/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS. `*` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8000".to_string(),
            ],
        }
    }
}

/// YouTube Data API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// YouTube Data API key.
    pub api_key: Option<String>,
    /// API base URL.
    pub base_url: String,
    /// Maximum number of videos fetched per playlist.
    pub max_results: usize,
    pub request_timeout_seconds: u64,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            max_results: 50,
            request_timeout_seconds: 30,
        }
    }
}

/// OpenAI client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key: None,
            request_timeout_seconds: 300,
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Longest video (in minutes) the downloader will wait for.
    pub max_video_duration_minutes: u64,
    /// Duration in seconds for splitting long audio files before upload.
    pub chunk_duration_seconds: u32,
    /// Maximum concurrent chunk uploads.
    pub max_concurrent_chunks: usize,
    /// Delete downloaded audio after transcription.
    pub cleanup_audio: bool,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            max_video_duration_minutes: 120,
            chunk_duration_seconds: 600,
            max_concurrent_chunks: 3,
            cleanup_audio: true,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Maximum inputs per embeddings request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 2048,
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Token budget for merged chunks.
    pub max_tokens: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { max_tokens: 800 }
    }
}

/// AI tutor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorSettings {
    /// Chat model used for answers.
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Default number of chunks retrieved per question.
    pub top_k: usize,
    /// Default number of previous exchanges included in the prompt.
    pub context_window: usize,
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            max_tokens: 800,
            temperature: 0.7,
            top_k: 5,
            context_window: 3,
        }
    }
}

/// Quiz generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
    pub model: String,
    /// Default number of questions per video.
    pub questions_per_video: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            questions_per_video: 5,
            max_tokens: 2000,
            temperature: 0.3,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides are applied on top of the file.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let mut settings = Self::load_file(path)?;
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Load only what the file says, without environment overrides.
    pub fn load_file(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Settings::default())
        }
    }

    /// Apply environment overrides using the given lookup function.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(key) = lookup("YOUTUBE_API_KEY") {
            self.youtube.api_key = Some(key);
        }
        if let Some(path) = lookup("STUD_STORAGE_PATH") {
            self.general.storage_path = path;
        }
        if let Some(host) = lookup("STUD_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("STUD_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(origins) = lookup("STUD_ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::StudError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Set a single value addressed by a dotted key (e.g. `tutor.model`).
    pub fn set_value(&mut self, key: &str, value: &str) -> crate::error::Result<()> {
        let (section, field) = key.split_once('.').ok_or_else(|| {
            crate::error::StudError::Config(format!("Expected <section>.<field>, got '{}'", key))
        })?;

        let mut tree = toml::Value::try_from(&*self)
            .map_err(|e| crate::error::StudError::Config(e.to_string()))?;

        let table = tree
            .get_mut(section)
            .and_then(|s| s.as_table_mut())
            .ok_or_else(|| crate::error::StudError::Config(format!("Unknown section: {}", section)))?;

        // Keep the existing type where we can tell what it is.
        let parsed = match table.get(field) {
            Some(toml::Value::Integer(_)) => value
                .parse::<i64>()
                .map(toml::Value::Integer)
                .map_err(|_| crate::error::StudError::Config(format!("{} expects an integer", key)))?,
            Some(toml::Value::Float(_)) => value
                .parse::<f64>()
                .map(toml::Value::Float)
                .map_err(|_| crate::error::StudError::Config(format!("{} expects a number", key)))?,
            Some(toml::Value::Boolean(_)) => value
                .parse::<bool>()
                .map(toml::Value::Boolean)
                .map_err(|_| crate::error::StudError::Config(format!("{} expects true or false", key)))?,
            Some(toml::Value::Array(_)) => toml::Value::Array(
                value
                    .split(',')
                    .map(|v| toml::Value::String(v.trim().to_string()))
                    .collect(),
            ),
            _ => toml::Value::String(value.to_string()),
        };
        table.insert(field.to_string(), parsed);

        *self = tree
            .try_into()
            .map_err(|e: toml::de::Error| crate::error::StudError::Config(e.to_string()))?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stud")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded storage directory path.
    pub fn storage_path(&self) -> PathBuf {
        Self::expand_path(&self.general.storage_path)
    }

    /// Timeout for audio downloads, derived from the longest accepted video.
    pub fn download_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.transcription.max_video_duration_minutes * 60)
    }
}
