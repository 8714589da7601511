//! Structural checks on generated quizzes.

use super::models::{QuizData, ValidationReport};
use std::collections::HashSet;

const OPTION_COUNT: usize = 4;
const MIN_QUESTION_CHARS: usize = 10;

/// Check a quiz for structural issues (which make it invalid) and warnings.
pub fn validate_quiz(quiz: &QuizData) -> ValidationReport {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    for (i, q) in quiz.questions.iter().enumerate() {
        let n = i + 1;

        if q.options.len() != OPTION_COUNT {
            issues.push(format!(
                "Question {}: Expected 4 options, got {}",
                n,
                q.options.len()
            ));
        }
        if !(0..OPTION_COUNT as i64).contains(&q.correct_index) {
            issues.push(format!(
                "Question {}: Invalid correct_index {} (must be 0-3)",
                n, q.correct_index
            ));
        }
        if q.question.chars().count() < MIN_QUESTION_CHARS {
            warnings.push(format!("Question {}: Question text seems too short", n));
        }
        if q.requires_review {
            warnings.push(format!("Question {}: Flagged for human review", n));
        }
    }

    let mut seen = HashSet::new();
    let has_duplicates = !quiz
        .questions
        .iter()
        .all(|q| seen.insert(q.question.trim().to_lowercase()));
    if has_duplicates {
        issues.push("Duplicate questions detected".to_string());
    }

    if quiz.questions.len() > 3 {
        let first = &quiz.questions[0].difficulty;
        if quiz.questions.iter().all(|q| &q.difficulty == first) {
            warnings.push(format!("All questions have same difficulty: {}", first));
        }
    }

    ValidationReport {
        valid: issues.is_empty(),
        issues,
        warnings,
        total_questions: quiz.questions.len(),
        needs_review: quiz.needs_review(),
    }
}
