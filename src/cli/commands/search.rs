//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    video_id: Option<String>,
    limit: usize,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::OpenAI, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.search(query, video_id.as_deref(), limit).await;
    spinner.finish_and_clear();

    match results {
        Ok(outcome) => {
            if outcome.matches.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!(
                    "Found {} results ({} chunks searched)",
                    outcome.matches.len(),
                    outcome.total_searched
                ));

                for m in &outcome.matches {
                    Output::search_result(&m.video_id, m.start, m.end, m.similarity, &m.text);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
