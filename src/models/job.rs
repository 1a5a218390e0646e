// Training job data models
use crate::models::TrainingConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How many log lines a snapshot exposes. The job record keeps the full
/// history; truncation happens only at read time.
pub const SNAPSHOT_LOG_LINES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingMethod {
    /// Sample generation plus a follow-up guide for an external training
    /// environment.
    OpenWakeWord,
    /// Fully automated end-to-end training against a local microWakeWord
    /// checkout.
    MicroWakeWord,
}

impl TrainingMethod {
    /// Unrecognized method names fall back to OpenWakeWord.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "microwakeword" => TrainingMethod::MicroWakeWord,
            _ => TrainingMethod::OpenWakeWord,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingMethod::OpenWakeWord => "openwakeword",
            TrainingMethod::MicroWakeWord => "microwakeword",
        }
    }
}

impl std::fmt::Display for TrainingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One wake-word training request, tracked end-to-end.
///
/// Exactly one of `model_path` / `error` is populated once the status is
/// terminal; neither is populated before that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingJob {
    pub id: String,
    /// Trimmed and lower-cased at submission.
    pub wake_word: String,
    pub method: TrainingMethod,
    pub config: TrainingConfig,
    pub author: String,
    pub website: String,
    pub status: JobStatus,
    pub progress: u8, // 0-100
    pub logs: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub model_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl TrainingJob {
    pub fn new(
        wake_word: &str,
        method: TrainingMethod,
        config: TrainingConfig,
        author: &str,
        website: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            wake_word: wake_word.to_string(),
            method,
            config,
            author: author.to_string(),
            website: website.to_string(),
            status: JobStatus::Pending,
            progress: 0,
            logs: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
            model_path: None,
            error: None,
        }
    }

    /// Filesystem-safe identifier derived from the wake word.
    pub fn model_id(&self) -> String {
        self.wake_word.replace(' ', "_")
    }

    pub fn push_log(&mut self, message: &str) {
        self.logs.push(format!(
            "[{}] {}",
            chrono::Local::now().format("%H:%M:%S"),
            message
        ));
    }

    /// The externally visible projection of this record, built as one
    /// consistent value.
    pub fn snapshot(&self) -> JobSnapshot {
        let start = self.logs.len().saturating_sub(SNAPSHOT_LOG_LINES);
        JobSnapshot {
            job_id: self.id.clone(),
            wake_word: self.wake_word.clone(),
            method: self.method,
            status: self.status,
            progress: self.progress,
            message: self.logs.last().cloned(),
            logs: self.logs[start..].to_vec(),
            created_at: self.created_at,
            completed_at: self.completed_at,
            model_path: self.model_path.clone(),
            error: self.error.clone(),
        }
    }
}

/// Point-in-time view of a job, pushed to subscribers and returned from
/// queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub wake_word: String,
    pub method: TrainingMethod,
    pub status: JobStatus,
    pub progress: u8,
    /// Most recent log line, if any.
    pub message: Option<String>,
    /// Last 50 log lines.
    pub logs: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub model_path: Option<PathBuf>,
    pub error: Option<String>,
}
