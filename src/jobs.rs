//! In-process tracking of background work.
//!
//! HTTP endpoints queue transcription, embedding and quiz generation as
//! detached tasks. The tracker remembers what is running and what failed so
//! status endpoints can say more than "not started". Finished work leaves its
//! artifact on disk, so completed jobs are forgotten; failures are kept for
//! a day so clients can read the error.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Hours a failed job's error stays visible.
const FAILURE_RETENTION_HOURS: i64 = 24;

/// Kind of background work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Transcription,
    Embedding,
    Quiz,
    Playlist,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::Transcription => "transcription",
            JobKind::Embedding => "embedding",
            JobKind::Quiz => "quiz",
            JobKind::Playlist => "playlist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Failed { error: String },
}

/// Last known state of one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobState {
    #[serde(flatten)]
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobState {
    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            JobStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Job states keyed by kind and subject id (video or playlist).
#[derive(Debug, Clone, Default)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<(JobKind, String), JobState>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a job as running. Returns `false` if it already is.
    pub async fn start(&self, kind: JobKind, id: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        let cutoff = Utc::now() - Duration::hours(FAILURE_RETENTION_HOURS);
        jobs.retain(|_, state| state.finished_at.map_or(true, |at| at > cutoff));

        let key = (kind, id.to_string());
        if jobs.get(&key).is_some_and(JobState::is_running) {
            return false;
        }
        jobs.insert(
            key,
            JobState {
                status: JobStatus::Running,
                started_at: Utc::now(),
                finished_at: None,
            },
        );
        true
    }

    /// Forget a finished job; its result now lives in storage.
    pub async fn complete(&self, kind: JobKind, id: &str) {
        self.jobs.write().await.remove(&(kind, id.to_string()));
    }

    pub async fn fail(&self, kind: JobKind, id: &str, error: impl Into<String>) {
        let mut jobs = self.jobs.write().await;
        let now = Utc::now();
        let state = jobs.entry((kind, id.to_string())).or_insert(JobState {
            status: JobStatus::Running,
            started_at: now,
            finished_at: None,
        });
        state.status = JobStatus::Failed { error: error.into() };
        state.finished_at = Some(now);
    }

    pub async fn get(&self, kind: JobKind, id: &str) -> Option<JobState> {
        self.jobs.read().await.get(&(kind, id.to_string())).cloned()
    }

    /// Run `task` on the runtime and record its outcome.
    ///
    /// Returns `false` without spawning when the same job is already running.
    pub async fn spawn<F, E>(&self, kind: JobKind, id: &str, task: F) -> bool
    where
        F: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        if !self.start(kind, id).await {
            info!("{} job for {} already running", kind, id);
            return false;
        }

        let tracker = self.clone();
        let id = id.to_string();
        let handle = tokio::spawn(task);
        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(())) => {
                    info!("{} job for {} completed", kind, id);
                    tracker.complete(kind, &id).await;
                }
                Ok(Err(e)) => {
                    error!("{} job for {} failed: {}", kind, id, e);
                    tracker.fail(kind, &id, e.to_string()).await;
                }
                Err(e) => {
                    error!("{} job for {} aborted: {}", kind, id, e);
                    tracker.fail(kind, &id, format!("job aborted: {}", e)).await;
                }
            }
        });
        true
    }
}
