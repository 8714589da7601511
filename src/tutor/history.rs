//! Per-session conversation history and answer feedback.

use crate::error::{Result, StudError};
use crate::storage::{Collection, JsonStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// One question/answer exchange of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub answer: String,
    pub confidence: f64,
    pub num_sources: usize,
}

/// Aggregate numbers for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,
    pub total_questions: usize,
    pub average_confidence: f64,
    pub first_question: Option<DateTime<Utc>>,
    pub last_question: Option<DateTime<Utc>>,
}

/// A student's rating of one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub timestamp: DateTime<Utc>,
    pub question_index: usize,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Conversation and feedback files under `conversations/` and `feedback/`.
#[derive(Clone)]
pub struct ConversationStore {
    store: JsonStore,
    // Serializes read-modify-write appends within this process.
    write_lock: Arc<Mutex<()>>,
}

impl ConversationStore {
    pub fn new(store: JsonStore) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StudError::Storage("conversation lock poisoned".to_string()))
    }

    /// Full history of a session, oldest first. Unknown sessions are empty.
    pub fn history(&self, session_id: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .store
            .read(Collection::Conversations, session_id)?
            .unwrap_or_default())
    }

    /// The last `window` exchanges of a session; `window == 0` yields none.
    pub fn recent(&self, session_id: &str, window: usize) -> Result<Vec<HistoryEntry>> {
        if window == 0 {
            return Ok(Vec::new());
        }
        let mut history = self.history(session_id)?;
        let skip = history.len().saturating_sub(window);
        Ok(history.split_off(skip))
    }

    /// Append an exchange to a session.
    pub fn append(&self, session_id: &str, entry: HistoryEntry) -> Result<()> {
        let _guard = self.lock()?;
        let mut history = self.history(session_id)?;
        history.push(entry);
        self.store
            .write(Collection::Conversations, session_id, &history)?;
        debug!("Session {} now has {} entries", session_id, history.len());
        Ok(())
    }

    /// Delete a session's history. Returns whether there was any.
    pub fn clear(&self, session_id: &str) -> Result<bool> {
        let _guard = self.lock()?;
        let removed = self.store.delete(Collection::Conversations, session_id)?;
        if removed {
            info!("Cleared history for session {}", session_id);
        }
        Ok(removed)
    }

    /// Statistics for a session; `NotFound` if it has no history.
    pub fn stats(&self, session_id: &str) -> Result<SessionStats> {
        let history = self.history(session_id)?;
        if history.is_empty() {
            return Err(StudError::NotFound(format!(
                "No history found for session: {}",
                session_id
            )));
        }

        let total = history.len();
        let average = history.iter().map(|h| h.confidence).sum::<f64>() / total as f64;

        Ok(SessionStats {
            session_id: session_id.to_string(),
            total_questions: total,
            average_confidence: round2(average),
            first_question: history.first().map(|h| h.timestamp),
            last_question: history.last().map(|h| h.timestamp),
        })
    }

    /// Store a rating for an answer. Ratings outside 1..=5 are rejected.
    pub fn record_feedback(
        &self,
        session_id: &str,
        question_index: usize,
        rating: u8,
        comment: Option<String>,
    ) -> Result<FeedbackEntry> {
        if !(1..=5).contains(&rating) {
            return Err(StudError::InvalidInput(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let entry = FeedbackEntry {
            timestamp: Utc::now(),
            question_index,
            rating,
            comment: comment.filter(|c| !c.trim().is_empty()),
        };

        let _guard = self.lock()?;
        let mut all: Vec<FeedbackEntry> = self
            .store
            .read(Collection::Feedback, session_id)?
            .unwrap_or_default();
        all.push(entry.clone());
        self.store.write(Collection::Feedback, session_id, &all)?;

        info!("Recorded rating {} for session {}", rating, session_id);
        Ok(entry)
    }

    /// All feedback recorded for a session.
    pub fn feedback(&self, session_id: &str) -> Result<Vec<FeedbackEntry>> {
        Ok(self
            .store
            .read(Collection::Feedback, session_id)?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(question: &str, confidence: f64) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc::now(),
            question: question.to_string(),
            answer: format!("answer to {}", question),
            confidence,
            num_sources: 3,
        }
    }

    #[test]
    fn test_append_and_recent() {
        let dir = tempfile::tempdir().unwrap();
        let conversations = ConversationStore::new(JsonStore::new(dir.path()));

        assert!(conversations.history("s1").unwrap().is_empty());

        for q in ["q1", "q2", "q3", "q4"] {
            conversations.append("s1", entry(q, 0.5)).unwrap();
        }

        let recent = conversations.recent("s1", 3).unwrap();
        let questions: Vec<&str> = recent.iter().map(|e| e.question.as_str()).collect();
        assert_eq!(questions, vec!["q2", "q3", "q4"]);

        assert!(conversations.recent("s1", 0).unwrap().is_empty());
        assert_eq!(conversations.recent("s1", 10).unwrap().len(), 4);
        assert_eq!(conversations.history("s1").unwrap().len(), 4);
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let conversations = ConversationStore::new(JsonStore::new(dir.path()));
        conversations.append("s1", entry("q", 0.9)).unwrap();

        assert!(conversations.clear("s1").unwrap());
        assert!(!conversations.clear("s1").unwrap());
        assert!(conversations.history("s1").unwrap().is_empty());
    }

    #[test]
    fn test_stats() {
        let dir = tempfile::tempdir().unwrap();
        let conversations = ConversationStore::new(JsonStore::new(dir.path()));

        let err = conversations.stats("empty").unwrap_err();
        assert!(err.is_not_found());

        conversations.append("s1", entry("a", 0.8)).unwrap();
        conversations.append("s1", entry("b", 0.555)).unwrap();
        conversations.append("s1", entry("c", 0.6)).unwrap();

        let stats = conversations.stats("s1").unwrap();
        assert_eq!(stats.total_questions, 3);
        assert_eq!(stats.average_confidence, 0.65);
        assert!(stats.first_question <= stats.last_question);
    }

    #[test]
    fn test_feedback_validation_and_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let conversations = ConversationStore::new(JsonStore::new(dir.path()));

        assert!(conversations.record_feedback("s1", 0, 0, None).unwrap_err().is_invalid_input());
        assert!(conversations.record_feedback("s1", 0, 6, None).unwrap_err().is_invalid_input());

        conversations.record_feedback("s1", 0, 5, Some("great".into())).unwrap();
        conversations.record_feedback("s1", 1, 2, Some("  ".into())).unwrap();

        let stored = conversations.feedback("s1").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].comment.as_deref(), Some("great"));
        assert_eq!(stored[1].comment, None);
    }
}
