//! OpenAI client configuration with sensible defaults.

use crate::config::Settings;
use crate::error::{Result, StudError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client from application settings.
pub fn client_from_settings(settings: &Settings) -> Result<Client<OpenAIConfig>> {
    create_client_with(
        settings.openai.api_key.as_deref(),
        Duration::from_secs(settings.openai.request_timeout_seconds),
    )
}

/// Create an OpenAI client with an explicit key (or the environment default) and timeout.
pub fn create_client_with(api_key: Option<&str>, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| StudError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let config = match api_key.filter(|k| !k.is_empty()) {
        Some(key) => OpenAIConfig::new().with_api_key(key),
        None => OpenAIConfig::default(),
    };

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Check if an OpenAI API key is available from settings or the environment.
pub fn is_api_key_configured(settings: &Settings) -> bool {
    settings.openai.api_key.as_ref().is_some_and(|k| !k.is_empty())
        || std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty())
}
