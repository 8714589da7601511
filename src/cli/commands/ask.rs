//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::tutor::AskRequest;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    video_id: Option<String>,
    session_id: Option<String>,
    top_k: Option<usize>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::OpenAI, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'stud doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let request = AskRequest {
        video_id,
        session_id,
        top_k,
        ..AskRequest::new(question)
    };

    let spinner = Output::spinner("Thinking...");
    let result = orchestrator.tutor().ask_question(request).await;
    spinner.finish_and_clear();

    let response = match result {
        Ok(r) => r,
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    };

    println!("\n{}\n", response.answer);
    Output::kv("Confidence", &format!("{:.2}", response.confidence));
    Output::kv("Session", &response.session_id);

    if !response.sources.is_empty() {
        Output::header("Sources");
        for source in &response.sources {
            Output::search_result(
                &source.video_id,
                source.start,
                source.end,
                source.similarity,
                &source.text,
            );
        }
    }

    if !response.suggested_questions.is_empty() {
        Output::header("You could also ask");
        for suggestion in &response.suggested_questions {
            Output::list_item(suggestion);
        }
    }

    Ok(())
}
