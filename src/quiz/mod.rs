//! Multiple-choice quiz generation from embedded transcripts.

mod models;
mod validation;

pub use models::{
    AnswerResult, QuestionView, QuizData, QuizQuestion, QuizView, ValidationReport,
    DEFAULT_DIFFICULTY, DIFFICULTIES,
};
pub use validation::validate_quiz;

use crate::config::{Prompts, QuizSettings};
use crate::error::{Result, StudError};
use crate::llm::{ChatModel, ChatRequest};
use crate::storage::{Collection, JsonStore};
use crate::vector_store::{EmbeddedChunk, VectorStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Upper bound on questions per request.
pub const MAX_QUESTIONS: usize = 20;

/// Transcript excerpt handed to the model: `[start - end]` headed blocks.
pub fn format_transcript(chunks: &[EmbeddedChunk]) -> String {
    chunks
        .iter()
        .map(|c| format!("[{:.1}s - {:.1}s]\n{}", c.chunk.start, c.chunk.end, c.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn difficulty_rule(difficulty: &str) -> String {
    if difficulty == "mixed" {
        r#"Assign a difficulty level: "beginner", "intermediate", or "advanced""#.to_string()
    } else {
        format!(r#"All questions must have difficulty level "{}""#, difficulty)
    }
}

/// Render the quiz prompt for a set of chunks.
pub fn build_quiz_prompt(
    prompts: &Prompts,
    chunks: &[EmbeddedChunk],
    num_questions: usize,
    difficulty: &str,
) -> String {
    let vars: HashMap<String, String> = [
        ("num_questions".to_string(), num_questions.to_string()),
        ("difficulty_rule".to_string(), difficulty_rule(difficulty)),
        ("transcript".to_string(), format_transcript(chunks)),
    ]
    .into_iter()
    .collect();

    prompts.render_with_custom(&prompts.quiz.user, &vars)
}

/// Parse the model's JSON reply, skipping malformed questions.
///
/// Fails when the reply is not JSON or no question survives.
pub fn parse_questions(raw: &str) -> Result<Vec<QuizQuestion>> {
    let value: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|e| StudError::Quiz(format!("Model returned invalid JSON: {}", e)))?;

    let items = value
        .get("questions")
        .and_then(|q| q.as_array())
        .cloned()
        .unwrap_or_default();

    let questions: Vec<QuizQuestion> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<QuizQuestion>(item) {
            Ok(q) => Some(q),
            Err(e) => {
                warn!("Skipping invalid question {}: {}", i + 1, e);
                None
            }
        })
        .collect();

    if questions.is_empty() {
        return Err(StudError::Quiz("No valid questions generated".to_string()));
    }
    Ok(questions)
}

/// Quiz generation, storage and grading.
pub struct QuizService {
    chat: Arc<dyn ChatModel>,
    vector_store: Arc<dyn VectorStore>,
    store: JsonStore,
    prompts: Arc<Prompts>,
    settings: QuizSettings,
}

impl QuizService {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        vector_store: Arc<dyn VectorStore>,
        store: JsonStore,
        prompts: Arc<Prompts>,
        settings: QuizSettings,
    ) -> Self {
        Self {
            chat,
            vector_store,
            store,
            prompts,
            settings,
        }
    }

    /// Check generation parameters before any work is queued.
    pub fn check_request(num_questions: usize, difficulty: &str) -> Result<()> {
        if num_questions == 0 || num_questions > MAX_QUESTIONS {
            return Err(StudError::InvalidInput(format!(
                "num_questions must be between 1 and {}",
                MAX_QUESTIONS
            )));
        }
        if !DIFFICULTIES.contains(&difficulty) {
            return Err(StudError::InvalidInput(format!(
                "Unknown difficulty '{}', expected one of: {}",
                difficulty,
                DIFFICULTIES.join(", ")
            )));
        }
        Ok(())
    }

    /// Generate and store a quiz for a video that has embeddings.
    #[instrument(skip(self))]
    pub async fn generate_quiz(
        &self,
        video_id: &str,
        num_questions: usize,
        difficulty: &str,
    ) -> Result<QuizData> {
        Self::check_request(num_questions, difficulty)?;

        let chunks = self.vector_store.chunks_for(video_id).await?.ok_or_else(|| {
            StudError::NotFound(format!(
                "Embeddings not found for video: {}. Generate embeddings first.",
                video_id
            ))
        })?;

        info!("Generating {} questions from {} chunks", num_questions, chunks.len());

        let user = build_quiz_prompt(&self.prompts, &chunks, num_questions, difficulty);
        let system = self
            .prompts
            .render_with_custom(&self.prompts.quiz.system, &HashMap::new());

        let reply = self
            .chat
            .complete(ChatRequest {
                model: self.settings.model.clone(),
                system,
                user,
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
                json_mode: true,
            })
            .await?;

        let quiz = QuizData {
            video_id: video_id.to_string(),
            questions: parse_questions(&reply)?,
        };
        self.save_quiz(&quiz)?;

        let flagged = quiz.needs_review();
        if flagged > 0 {
            warn!("{} questions flagged for human review", flagged);
        }
        info!("Saved quiz with {} questions", quiz.questions.len());
        Ok(quiz)
    }

    pub fn save_quiz(&self, quiz: &QuizData) -> Result<()> {
        self.store.write(Collection::Quizzes, &quiz.video_id, quiz)?;
        Ok(())
    }

    /// Stored quiz; `NotFound` when none was generated.
    pub fn load_quiz(&self, video_id: &str) -> Result<QuizData> {
        self.store
            .read(Collection::Quizzes, video_id)?
            .ok_or_else(|| StudError::NotFound(format!("Quiz not found for video: {}", video_id)))
    }

    pub fn has_quiz(&self, video_id: &str) -> Result<bool> {
        self.store.exists(Collection::Quizzes, video_id)
    }

    pub fn view(&self, video_id: &str, include_answers: bool) -> Result<QuizView> {
        Ok(QuizView::from_quiz(&self.load_quiz(video_id)?, include_answers))
    }

    pub fn validate(&self, video_id: &str) -> Result<ValidationReport> {
        Ok(validate_quiz(&self.load_quiz(video_id)?))
    }

    /// Grade one answer.
    pub fn submit_answer(
        &self,
        video_id: &str,
        question_id: usize,
        answer_index: i64,
    ) -> Result<AnswerResult> {
        let quiz = self.load_quiz(video_id)?;
        let question = quiz.questions.get(question_id).ok_or_else(|| {
            StudError::InvalidInput(format!("Invalid question_id: {}", question_id))
        })?;

        if !(0..=3).contains(&answer_index) {
            return Err(StudError::InvalidInput(format!(
                "Invalid answer_index: {} (must be 0-3)",
                answer_index
            )));
        }

        Ok(AnswerResult {
            correct: answer_index == question.correct_index,
            selected_index: answer_index as usize,
            correct_index: question.correct_index,
            explanation: question.explanation.clone(),
            timestamp_reference: question.timestamp_reference,
        })
    }

    /// Record a human review: a reviewed question no longer requires review.
    pub fn mark_reviewed(
        &self,
        video_id: &str,
        question_id: usize,
        reviewed: bool,
        reviewer_notes: Option<String>,
    ) -> Result<QuizQuestion> {
        let mut quiz = self.load_quiz(video_id)?;
        let question = quiz.questions.get_mut(question_id).ok_or_else(|| {
            StudError::InvalidInput(format!("Invalid question_id: {}", question_id))
        })?;

        question.requires_review = !reviewed;
        if reviewer_notes.is_some() {
            question.reviewer_notes = reviewer_notes;
        }
        let updated = question.clone();

        self.save_quiz(&quiz)?;
        info!(
            "Question {} of {} marked requires_review={}",
            question_id, video_id, updated.requires_review
        );
        Ok(updated)
    }
}
