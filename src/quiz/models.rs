//! Quiz data models.

use serde::{Deserialize, Serialize};

/// Difficulty assumed when the model does not state one.
pub const DEFAULT_DIFFICULTY: &str = "intermediate";

/// Difficulties a quiz may be generated at. `mixed` lets the model choose per question.
pub const DIFFICULTIES: [&str; 4] = ["beginner", "intermediate", "advanced", "mixed"];

fn default_difficulty() -> String {
    DEFAULT_DIFFICULTY.to_string()
}

/// A multiple-choice question grounded in a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index of the correct option. Signed so malformed model output survives
    /// parsing and is reported by validation.
    pub correct_index: i64,
    pub explanation: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default)]
    pub requires_review: bool,
    #[serde(default)]
    pub timestamp_reference: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_notes: Option<String>,
}

/// Stored quiz of a video, `quizzes/<video_id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizData {
    pub video_id: String,
    pub questions: Vec<QuizQuestion>,
}

impl QuizData {
    pub fn needs_review(&self) -> usize {
        self.questions.iter().filter(|q| q.requires_review).count()
    }
}

/// A question as shown to a student or instructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub question_id: usize,
    pub question: String,
    pub options: Vec<String>,
    pub difficulty: String,
    pub timestamp_reference: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_review: Option<bool>,
}

/// A quiz as served over the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizView {
    pub video_id: String,
    pub total_questions: usize,
    pub questions: Vec<QuestionView>,
}

impl QuizView {
    /// Project a quiz, hiding answers unless `include_answers`.
    pub fn from_quiz(quiz: &QuizData, include_answers: bool) -> Self {
        let questions = quiz
            .questions
            .iter()
            .enumerate()
            .map(|(question_id, q)| QuestionView {
                question_id,
                question: q.question.clone(),
                options: q.options.clone(),
                difficulty: q.difficulty.clone(),
                timestamp_reference: q.timestamp_reference,
                correct_index: include_answers.then_some(q.correct_index),
                explanation: include_answers.then(|| q.explanation.clone()),
                requires_review: include_answers.then_some(q.requires_review),
            })
            .collect();

        Self {
            video_id: quiz.video_id.clone(),
            total_questions: quiz.questions.len(),
            questions,
        }
    }
}

/// Outcome of answering one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub correct: bool,
    pub selected_index: usize,
    pub correct_index: i64,
    pub explanation: String,
    pub timestamp_reference: Option<f64>,
}

/// Problems found in a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub total_questions: usize,
    pub needs_review: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_defaults() {
        let q: QuizQuestion = serde_json::from_str(
            r#"{"question": "What is Rust?", "options": ["a","b","c","d"], "correct_index": 2, "explanation": "said at 3s"}"#,
        )
        .unwrap();
        assert_eq!(q.difficulty, "intermediate");
        assert!(!q.requires_review);
        assert_eq!(q.timestamp_reference, None);
    }

    #[test]
    fn test_student_view_hides_answers() {
        let quiz = QuizData {
            video_id: "vid".into(),
            questions: vec![QuizQuestion {
                question: "What is Rust?".into(),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_index: 1,
                explanation: "At 10s".into(),
                difficulty: "beginner".into(),
                requires_review: true,
                timestamp_reference: Some(10.0),
                reviewer_notes: None,
            }],
        };

        let student = serde_json::to_value(QuizView::from_quiz(&quiz, false)).unwrap();
        let q = &student["questions"][0];
        assert_eq!(q["question_id"], 0);
        assert!(q.get("correct_index").is_none());
        assert!(q.get("explanation").is_none());
        assert!(q.get("requires_review").is_none());
        assert_eq!(student["total_questions"], 1);

        let instructor = QuizView::from_quiz(&quiz, true);
        assert_eq!(instructor.questions[0].correct_index, Some(1));
        assert_eq!(instructor.questions[0].requires_review, Some(true));
    }
}
