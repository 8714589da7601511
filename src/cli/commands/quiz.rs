//! Quiz command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::quiz::QuizView;
use anyhow::Result;

const OPTION_LABELS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Run the quiz command.
pub async fn run_quiz(
    video_id: &str,
    questions: Option<usize>,
    difficulty: &str,
    regenerate: bool,
    show_answers: bool,
    settings: Settings,
) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let quizzes = orchestrator.quizzes();

    if regenerate || !quizzes.has_quiz(video_id)? {
        if let Err(e) = preflight::check(Operation::OpenAI, orchestrator.settings()) {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }

        let count = questions.unwrap_or(orchestrator.settings().quiz.questions_per_video);
        let spinner = Output::spinner(&format!("Generating {} {} questions...", count, difficulty));
        let result = quizzes.generate_quiz(video_id, count, difficulty).await;
        spinner.finish_and_clear();

        match result {
            Ok(quiz) => Output::success(&format!(
                "Generated {} questions for {}",
                quiz.questions.len(),
                video_id
            )),
            Err(e) => {
                Output::error(&format!("Failed to generate quiz: {}", e));
                return Err(e.into());
            }
        }
    }

    let view = quizzes.view(video_id, show_answers)?;
    print_quiz(&view);

    let report = quizzes.validate(video_id)?;
    println!();
    if report.valid {
        Output::success(&format!(
            "Quiz is valid ({} flagged for review)",
            report.needs_review
        ));
    } else {
        Output::warning("Quiz has structural issues:");
        for issue in &report.issues {
            Output::list_item(issue);
        }
    }
    for warning in &report.warnings {
        Output::list_item(warning);
    }

    Ok(())
}

fn print_quiz(view: &QuizView) {
    Output::header(&format!("Quiz for {} ({} questions)", view.video_id, view.total_questions));

    for q in &view.questions {
        println!("\n{}. {} [{}]", q.question_id + 1, q.question, q.difficulty);
        for (label, option) in OPTION_LABELS.iter().zip(&q.options) {
            println!("   {}) {}", label, option);
        }
        if let Some(correct) = q.correct_index {
            let label = usize::try_from(correct)
                .ok()
                .and_then(|i| OPTION_LABELS.get(i))
                .map(|c| c.to_string())
                .unwrap_or_else(|| format!("invalid ({})", correct));
            Output::kv("Answer", &label);
        }
        if let Some(explanation) = &q.explanation {
            Output::kv("Why", explanation);
        }
        if let Some(ts) = q.timestamp_reference {
            Output::kv("At", &format!("{:.0}s", ts));
        }
        if q.requires_review == Some(true) {
            Output::kv("Review", "flagged for instructor review");
        }
    }
}
