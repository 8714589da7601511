//! Retrieval-augmented tutor answering questions about video content.
//!
//! A question is embedded, matched against stored transcript chunks, and
//! answered by a chat model that is instructed to use only those chunks.
//! Every answered exchange is appended to the session history.

mod history;

pub use history::{ConversationStore, FeedbackEntry, HistoryEntry, SessionStats};

use crate::config::{Prompts, TutorSettings};
use crate::embedding::Embedder;
use crate::error::{Result, StudError};
use crate::llm::{ChatModel, ChatRequest};
use crate::vector_store::{ChunkMatch, VectorStore};
use chrono::Utc;
use history::round2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{info, instrument};

/// Answer given when retrieval finds nothing.
pub const NO_CONTEXT_ANSWER: &str = "I couldn't find any relevant information in the video content to answer your question. Could you rephrase or ask about a different topic covered in the videos?";

/// Shortest accepted question, after trimming.
pub const MIN_QUESTION_CHARS: usize = 3;

const SOURCE_PREVIEW_CHARS: usize = 200;

const UNCERTAINTY_PHRASES: [&str; 7] = [
    "i don't know",
    "unclear",
    "not sure",
    "might be",
    "possibly",
    "i couldn't find",
    "insufficient",
];

const GENERIC_FOLLOW_UPS: [&str; 3] = [
    "Can you explain this in simpler terms?",
    "What are common mistakes to avoid?",
    "Where can I learn more about this topic?",
];

const STARTER_QUESTIONS: [&str; 10] = [
    "What is the main topic covered in this video?",
    "Can you explain the key concepts from this video?",
    "What are the most important points to remember?",
    "How can I apply what I learned?",
    "What are common mistakes related to this topic?",
    "Can you give me a summary of this video?",
    "What prerequisites do I need for this topic?",
    "Are there any advanced concepts explained?",
    "What real-world examples are mentioned?",
    "How does this relate to other topics?",
];

/// A question for the tutor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Restrict retrieval to one video.
    #[serde(default)]
    pub video_id: Option<String>,
    /// Continue an existing session; a new one is created when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub context_window: Option<usize>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }
}

/// A cited transcript excerpt supporting an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub video_id: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub similarity: f32,
}

/// The tutor's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorResponse {
    pub question: String,
    pub answer: String,
    pub sources: Vec<Source>,
    pub confidence: f64,
    pub suggested_questions: Vec<String>,
    pub session_id: String,
}

/// Build the user prompt from history, retrieved chunks and the question.
pub fn build_tutor_prompt(
    question: &str,
    chunks: &[ChunkMatch],
    history: &[HistoryEntry],
    instructions: &str,
) -> String {
    let mut history_text = String::new();
    if !history.is_empty() {
        history_text.push_str("\n\nPREVIOUS CONVERSATION:\n");
        for entry in history {
            let _ = write!(
                history_text,
                "Student: {}\nTutor: {}\n\n",
                entry.question, entry.answer
            );
        }
    }

    let mut context_text = String::from("\n\nRELEVANT VIDEO CONTENT:\n");
    for (i, chunk) in chunks.iter().enumerate() {
        let _ = write!(
            context_text,
            "\nChunk {} [{:.1}s - {:.1}s] (Video: {}):\n{}\n",
            i + 1,
            chunk.start,
            chunk.end,
            chunk.video_id,
            chunk.text
        );
    }

    format!(
        "{}\n{}\n\nCURRENT QUESTION:\n{}\n\n{}",
        history_text, context_text, question, instructions
    )
}

/// Truncate `text` to the preview length, marking the cut with `...`.
fn preview(text: &str) -> String {
    match text.char_indices().nth(SOURCE_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Source citations for retrieved chunks.
pub fn extract_sources(chunks: &[ChunkMatch]) -> Vec<Source> {
    chunks
        .iter()
        .map(|c| Source {
            video_id: c.video_id.clone(),
            start: c.start,
            end: c.end,
            text: preview(&c.text),
            similarity: c.similarity,
        })
        .collect()
}

/// Heuristic confidence in `answer`, in [0, 1] with two decimals.
///
/// Mean retrieval similarity, lowered by 0.2 when the answer hedges and by
/// 0.1 when fewer than three chunks supported it.
pub fn calculate_confidence(chunks: &[ChunkMatch], answer: &str) -> f64 {
    if chunks.is_empty() {
        return 0.0;
    }

    let average =
        chunks.iter().map(|c| c.similarity as f64).sum::<f64>() / chunks.len() as f64;

    let answer_lower = answer.to_lowercase();
    let uncertainty_penalty = if UNCERTAINTY_PHRASES.iter().any(|p| answer_lower.contains(p)) {
        0.2
    } else {
        0.0
    };
    let chunk_penalty = if chunks.len() >= 3 { 0.0 } else { 0.1 };

    round2((average - uncertainty_penalty - chunk_penalty).clamp(0.0, 1.0))
}

/// Follow-up suggestions keyed on the question word, padded with generic ones.
pub fn suggest_follow_ups(question: &str) -> Vec<String> {
    let lower = question.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();
    let asks = |word: &str| words.iter().any(|w| *w == word || w.starts_with(&format!("{}'", word)));

    let mut suggestions = Vec::new();
    if asks("what") {
        suggestions.push("How does this work in practice?");
    }
    if asks("how") {
        suggestions.push("Can you give me an example?");
    }
    if asks("why") {
        suggestions.push("What are the benefits of this approach?");
    }
    suggestions.extend(GENERIC_FOLLOW_UPS);

    suggestions.into_iter().take(3).map(String::from).collect()
}

/// Generic starter questions for a video, at most 10.
pub fn starter_questions(count: usize) -> Vec<String> {
    STARTER_QUESTIONS
        .iter()
        .take(count.min(STARTER_QUESTIONS.len()))
        .map(|q| q.to_string())
        .collect()
}

/// The tutor: retrieval, prompting, scoring and history.
pub struct TutorService {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    chat: Arc<dyn ChatModel>,
    conversations: ConversationStore,
    prompts: Arc<Prompts>,
    settings: TutorSettings,
}

impl TutorService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        chat: Arc<dyn ChatModel>,
        conversations: ConversationStore,
        prompts: Arc<Prompts>,
        settings: TutorSettings,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            chat,
            conversations,
            prompts,
            settings,
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Answer a question from the stored video content.
    #[instrument(skip(self, request), fields(video_id = ?request.video_id))]
    pub async fn ask_question(&self, request: AskRequest) -> Result<TutorResponse> {
        let question = request.question.trim();
        if question.chars().count() < MIN_QUESTION_CHARS {
            return Err(StudError::InvalidInput(format!(
                "Question must be at least {} characters long",
                MIN_QUESTION_CHARS
            )));
        }

        let session_id = request
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let top_k = request.top_k.unwrap_or(self.settings.top_k);
        let context_window = request.context_window.unwrap_or(self.settings.context_window);

        let chunks = self
            .retrieve(question, request.video_id.as_deref(), top_k)
            .await?;

        if chunks.is_empty() {
            info!("No relevant chunks for question");
            return Ok(TutorResponse {
                question: question.to_string(),
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                confidence: 0.0,
                suggested_questions: Vec::new(),
                session_id,
            });
        }

        info!("Retrieved {} relevant chunks", chunks.len());

        let history = self.conversations.recent(&session_id, context_window)?;

        let no_vars = HashMap::new();
        let instructions = self
            .prompts
            .render_with_custom(&self.prompts.tutor.instructions, &no_vars);
        let user = build_tutor_prompt(question, &chunks, &history, &instructions);
        let system = self
            .prompts
            .render_with_custom(&self.prompts.tutor.system, &no_vars);

        let answer = self
            .chat
            .complete(ChatRequest {
                model: self.settings.model.clone(),
                system,
                user,
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
                json_mode: false,
            })
            .await
            .map_err(|e| StudError::Tutor(format!("Failed to generate answer: {}", e)))?;

        let response = TutorResponse {
            question: question.to_string(),
            sources: extract_sources(&chunks),
            confidence: calculate_confidence(&chunks, &answer),
            suggested_questions: suggest_follow_ups(question),
            answer,
            session_id,
        };

        self.conversations.append(
            &response.session_id,
            HistoryEntry {
                timestamp: Utc::now(),
                question: response.question.clone(),
                answer: response.answer.clone(),
                confidence: response.confidence,
                num_sources: response.sources.len(),
            },
        )?;

        info!("Answered with confidence {:.2}", response.confidence);
        Ok(response)
    }

    async fn retrieve(
        &self,
        question: &str,
        video_id: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<ChunkMatch>> {
        if top_k == 0 || !self.vector_store.has_any().await? {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed(question).await?;
        let outcome = self
            .vector_store
            .search(&query_embedding, video_id, top_k)
            .await?;
        Ok(outcome.matches)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FixedEmbedder;
    use super::*;
    use crate::llm::ScriptedChat;
    use crate::storage::JsonStore;
    use crate::vector_store::{embedded, MemoryVectorStore};

    fn chunk(video_id: &str, text: &str, similarity: f32) -> ChunkMatch {
        ChunkMatch {
            video_id: video_id.to_string(),
            chunk_index: 0,
            text: text.to_string(),
            start: 12.0,
            end: 34.56,
            similarity,
        }
    }

    #[test]
    fn test_build_prompt_layout() {
        let history = vec![HistoryEntry {
            timestamp: Utc::now(),
            question: "What is a borrow?".into(),
            answer: "A reference.".into(),
            confidence: 0.8,
            num_sources: 2,
        }];
        let prompt = build_tutor_prompt(
            "Why lifetimes?",
            &[chunk("vid", "Lifetimes track borrows.", 0.9)],
            &history,
            "Answer well.",
        );

        assert!(prompt.starts_with("\n\nPREVIOUS CONVERSATION:\nStudent: What is a borrow?\nTutor: A reference.\n\n"));
        assert!(prompt.contains("RELEVANT VIDEO CONTENT:\n\nChunk 1 [12.0s - 34.6s] (Video: vid):\nLifetimes track borrows.\n"));
        assert!(prompt.ends_with("\n\nCURRENT QUESTION:\nWhy lifetimes?\n\nAnswer well."));
    }

    #[test]
    fn test_build_prompt_without_history() {
        let prompt = build_tutor_prompt("Q?", &[chunk("v", "t", 0.5)], &[], "I");
        assert!(prompt.starts_with("\n\n\nRELEVANT VIDEO CONTENT:"));
        assert!(!prompt.contains("PREVIOUS CONVERSATION"));
    }

    #[test]
    fn test_extract_sources_truncates() {
        let long = "x".repeat(250);
        let sources = extract_sources(&[chunk("v", &long, 0.7), chunk("v", "short", 0.6)]);
        assert_eq!(sources[0].text.len(), 203);
        assert!(sources[0].text.ends_with("..."));
        assert_eq!(sources[1].text, "short");

        let exact = "y".repeat(200);
        assert_eq!(extract_sources(&[chunk("v", &exact, 0.1)])[0].text, exact);
    }

    #[test]
    fn test_confidence() {
        let three = vec![chunk("v", "a", 0.9), chunk("v", "b", 0.8), chunk("v", "c", 0.7)];
        assert_eq!(calculate_confidence(&three, "Ownership moves values."), 0.8);
        assert_eq!(calculate_confidence(&three, "It MIGHT BE about moves."), 0.6);

        let one = vec![chunk("v", "a", 0.5)];
        assert_eq!(calculate_confidence(&one, "Clear."), 0.4);
        assert_eq!(calculate_confidence(&one, "Unclear, possibly."), 0.2);

        let weak = vec![chunk("v", "a", 0.1)];
        assert_eq!(calculate_confidence(&weak, "I don't know"), 0.0);
        assert_eq!(calculate_confidence(&[], "anything"), 0.0);
    }

    #[test]
    fn test_suggest_follow_ups() {
        assert_eq!(
            suggest_follow_ups("What is ownership?"),
            vec![
                "How does this work in practice?",
                "Can you explain this in simpler terms?",
                "What are common mistakes to avoid?",
            ]
        );
        assert_eq!(
            suggest_follow_ups("Why and how does it work?"),
            vec![
                "Can you give me an example?",
                "What are the benefits of this approach?",
                "Can you explain this in simpler terms?",
            ]
        );
        assert_eq!(suggest_follow_ups("Explain traits")[0], GENERIC_FOLLOW_UPS[0]);
        assert_eq!(suggest_follow_ups("what's a trait")[0], "How does this work in practice?");
        // Substrings of other words do not count
        assert_eq!(suggest_follow_ups("Show me somewhat more")[0], GENERIC_FOLLOW_UPS[0]);
    }

    #[test]
    fn test_starter_questions() {
        assert_eq!(starter_questions(5).len(), 5);
        assert_eq!(starter_questions(50).len(), 10);
        assert!(starter_questions(0).is_empty());
    }

    async fn tutor_with(
        dir: &std::path::Path,
        chat: Arc<ScriptedChat>,
        seed: bool,
    ) -> TutorService {
        let vector_store = Arc::new(MemoryVectorStore::new());
        if seed {
            vector_store
                .save_video(
                    "vid",
                    &[
                        embedded("vid", 0, "Ownership means one owner.", vec![1.0, 0.0]),
                        embedded("vid", 1, "Borrowing lends access.", vec![0.8, 0.6]),
                    ],
                )
                .await
                .unwrap();
        }

        TutorService::new(
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            vector_store,
            chat,
            ConversationStore::new(JsonStore::new(dir)),
            Arc::new(Prompts::default()),
            TutorSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_ask_question_answers_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let chat = Arc::new(ScriptedChat::new(vec![
            Ok("At 0:00 the video says each value has one owner.".into()),
            Ok("Borrowing lends access without moving.".into()),
        ]));
        let tutor = tutor_with(dir.path(), chat.clone(), true).await;

        let mut request = AskRequest::new("  What is ownership?  ");
        request.session_id = Some("session-1".into());
        let first = tutor.ask_question(request).await.unwrap();

        assert_eq!(first.question, "What is ownership?");
        assert_eq!(first.session_id, "session-1");
        assert_eq!(first.sources.len(), 2);
        assert_eq!(first.sources[0].text, "Ownership means one owner.");
        // mean(1.0, 0.8) - 0.1 for fewer than three chunks
        assert_eq!(first.confidence, 0.8);
        assert_eq!(first.suggested_questions.len(), 3);

        let mut follow_up = AskRequest::new("How does borrowing work?");
        follow_up.session_id = Some("session-1".into());
        tutor.ask_question(follow_up).await.unwrap();

        let requests = chat.requests.lock().unwrap();
        assert_eq!(requests[0].model, "gpt-4");
        assert_eq!(requests[0].max_tokens, 800);
        assert!(!requests[0].user.contains("PREVIOUS CONVERSATION"));
        assert!(requests[1].user.contains("Student: What is ownership?"));
        assert!(requests[1].system.contains("AI tutor"));

        let history = tutor.conversations().history("session-1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].num_sources, 2);
    }

    #[tokio::test]
    async fn test_ask_question_without_content() {
        let dir = tempfile::tempdir().unwrap();
        let chat = Arc::new(ScriptedChat::new(vec![]));
        let tutor = tutor_with(dir.path(), chat.clone(), false).await;

        let response = tutor.ask_question(AskRequest::new("What is ownership?")).await.unwrap();
        assert_eq!(response.answer, NO_CONTEXT_ANSWER);
        assert_eq!(response.confidence, 0.0);
        assert!(response.sources.is_empty());
        assert!(response.suggested_questions.is_empty());
        assert!(uuid::Uuid::parse_str(&response.session_id).is_ok());

        assert!(chat.requests.lock().unwrap().is_empty());
        assert!(tutor.conversations().history(&response.session_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ask_question_rejects_short_question() {
        let dir = tempfile::tempdir().unwrap();
        let tutor = tutor_with(dir.path(), Arc::new(ScriptedChat::new(vec![])), true).await;

        let err = tutor.ask_question(AskRequest::new("  ab ")).await.unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn test_chat_failure_is_tutor_error_and_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let chat = Arc::new(ScriptedChat::new(vec![Err(StudError::OpenAI("rate limited".into()))]));
        let tutor = tutor_with(dir.path(), chat, true).await;

        let request = AskRequest {
            session_id: Some("s-fail".into()),
            ..AskRequest::new("What is ownership?")
        };
        let err = tutor.ask_question(request).await.unwrap_err();
        assert!(matches!(&err, StudError::Tutor(msg) if msg.contains("rate limited")));
        assert!(tutor.conversations().history("s-fail").unwrap().is_empty());
    }
}
