// Progress reporting for pipeline workers
use crate::error::EngineError;
use crate::models::JobStatus;
use crate::registry::JobRegistry;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;

/// Reports progress for exactly one job.
///
/// Each report appends a timestamped log line, updates the numeric progress
/// (and optionally the status), and pushes the resulting snapshot to every
/// current subscriber. The owning pipeline worker is the only writer, so
/// observers see reports in emission order.
pub struct ProgressReporter {
    registry: Arc<JobRegistry>,
    job_id: String,
}

impl ProgressReporter {
    pub fn new(registry: Arc<JobRegistry>, job_id: impl Into<String>) -> Self {
        Self {
            registry,
            job_id: job_id.into(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn report(&self, progress: u8, message: &str, status: Option<JobStatus>) {
        let updated = self.registry.update(&self.job_id, |job| {
            job.progress = progress;
            if let Some(status) = status {
                job.status = status;
            }
            job.push_log(message);
        });

        if updated.is_none() {
            log::warn!("Progress report for unknown job: {}", self.job_id);
        }
    }

    /// Terminal success: progress 100, completion timestamp, model artifact
    /// path. Applied in one registry update so the terminal invariant holds
    /// atomically.
    pub(crate) fn complete(&self, model_path: PathBuf, message: &str) {
        self.registry.update(&self.job_id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.completed_at = Some(Utc::now());
            job.model_path = Some(model_path);
            job.push_log(message);
        });
    }

    /// Terminal failure: progress reset to 0, full error detail recorded.
    pub(crate) fn fail(&self, error: &EngineError) {
        let detail = error.to_string();
        self.registry.update(&self.job_id, |job| {
            job.status = JobStatus::Failed;
            job.progress = 0;
            job.completed_at = Some(Utc::now());
            job.error = Some(detail.clone());
            job.push_log(&format!("Training failed: {}", detail));
        });
    }
}
