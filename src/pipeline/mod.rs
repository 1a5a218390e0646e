// Staged pipeline execution, one background worker per job
pub mod microwakeword;
pub mod openwakeword;

use crate::engine::EngineSettings;
use crate::models::{TrainingConfig, TrainingMethod};
use crate::progress::ProgressReporter;
use crate::registry::JobRegistry;
use crate::utils::EngineLayout;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a pipeline worker needs to drive one job.
pub(crate) struct PipelineContext {
    pub registry: Arc<JobRegistry>,
    pub layout: EngineLayout,
    pub settings: EngineSettings,
    pub job_id: String,
    pub wake_word: String,
    pub author: String,
    pub website: String,
    pub config: TrainingConfig,
}

impl PipelineContext {
    pub fn job_dir(&self) -> PathBuf {
        self.layout.job_dir(&self.job_id)
    }

    pub fn model_id(&self) -> String {
        self.wake_word.replace(' ', "_")
    }
}

pub(crate) struct PipelineOutcome {
    pub model_path: PathBuf,
    pub message: &'static str,
}

/// Drive one job from dispatch to its terminal state.
///
/// Stages run strictly sequentially and fail fast: the first stage error
/// aborts the rest, is logged with full diagnostics, and moves the job to
/// `failed` with progress reset to 0. Nothing here can take down other jobs'
/// workers.
pub(crate) async fn run_job(ctx: PipelineContext, method: TrainingMethod) {
    let reporter = ProgressReporter::new(ctx.registry.clone(), ctx.job_id.clone());

    let outcome = match method {
        TrainingMethod::OpenWakeWord => openwakeword::run(&ctx, &reporter).await,
        TrainingMethod::MicroWakeWord => microwakeword::run(&ctx, &reporter).await,
    };

    match outcome {
        Ok(outcome) => {
            log::info!(
                "Training job {} completed, model at {:?}",
                ctx.job_id,
                outcome.model_path
            );
            reporter.complete(outcome.model_path, outcome.message);
        }
        Err(error) => {
            log::error!("Training job {} failed: {}", ctx.job_id, error);
            reporter.fail(&error);
        }
    }
}
