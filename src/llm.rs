//! Chat completion seam used by the tutor and quiz generator.

use crate::error::{Result, StudError};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// A single-turn chat request: system prompt plus one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the model for a JSON object response.
    pub json_mode: bool,
}

/// Something that can answer a chat request with text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

/// [`ChatModel`] backed by the OpenAI chat completions API.
pub struct OpenAIChat {
    client: Client<OpenAIConfig>,
}

impl OpenAIChat {
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    #[instrument(skip(self, request), fields(model = %request.model, json = request.json_mode))]
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system)
                .build()
                .map_err(|e| StudError::OpenAI(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user)
                .build()
                .map_err(|e| StudError::OpenAI(e.to_string()))?
                .into(),
        ];

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&request.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_completion_tokens(request.max_tokens);
        if request.json_mode {
            builder.response_format(ResponseFormat::JsonObject);
        }
        let chat_request = builder
            .build()
            .map_err(|e| StudError::OpenAI(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| StudError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| StudError::OpenAI("Empty response from model".to_string()))?;

        debug!("Received {} characters", content.len());
        Ok(content)
    }
}

/// Canned chat model for tests. Returns the queued replies in order and
/// records every request it saw.
#[cfg(test)]
pub(crate) struct ScriptedChat {
    replies: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
    pub requests: std::sync::Mutex<Vec<ChatRequest>>,
}

#[cfg(test)]
impl ScriptedChat {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }
}

#[cfg(test)]
#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(StudError::OpenAI("no scripted reply".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_chat_replays_in_order() {
        let chat = ScriptedChat::new(vec![Ok("one".into()), Ok("two".into())]);
        let request = ChatRequest {
            model: "gpt-4".into(),
            system: "sys".into(),
            user: "hi".into(),
            temperature: 0.7,
            max_tokens: 10,
            json_mode: false,
        };

        assert_eq!(chat.complete(request.clone()).await.unwrap(), "one");
        assert_eq!(chat.complete(request.clone()).await.unwrap(), "two");
        assert!(chat.complete(request).await.is_err());
        assert_eq!(chat.requests.lock().unwrap().len(), 3);
    }
}
