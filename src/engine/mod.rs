// Engine boundary exposed to the transport layer
use crate::artifacts::{self, ModelPackage};
use crate::error::{EngineError, EngineResult};
use crate::models::{JobSnapshot, JobStatus, TrainingConfig, TrainingMethod};
use crate::pipeline::{self, PipelineContext};
use crate::process_manager::python_path;
use crate::registry::{JobRegistry, JobSubscription, DEFAULT_MAX_RETAINED_JOBS};
use crate::utils::EngineLayout;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_FEATURE_GENERATOR_URL: &str = "http://feature-generator:5001";

/// Engine configuration. `Default` resolves the data directory, probes for a
/// Python interpreter and honors the `FEATURE_GENERATOR_URL` environment
/// variable.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub base_dir: PathBuf,
    /// Base URL of the spectrogram service consumed by the automated
    /// pipeline.
    pub feature_generator_url: String,
    pub piper_generator_script: PathBuf,
    pub piper_voice_model: PathBuf,
    pub python_program: String,
    pub pip_program: String,
    /// Retention cap for the job registry.
    pub max_retained_jobs: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_dir: EngineLayout::default_base_dir(),
            feature_generator_url: std::env::var("FEATURE_GENERATOR_URL")
                .unwrap_or_else(|_| DEFAULT_FEATURE_GENERATOR_URL.to_string()),
            piper_generator_script: PathBuf::from(
                "/app/piper-sample-generator/generate_samples.py",
            ),
            piper_voice_model: PathBuf::from("/app/voices/en_US-lessac-medium.onnx"),
            python_program: python_path(),
            pip_program: "pip".to_string(),
            max_retained_jobs: DEFAULT_MAX_RETAINED_JOBS,
        }
    }
}

/// A training request as received from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub wake_word: String,
    /// Method name; unrecognized values fall back to OpenWakeWord.
    pub method: String,
    pub config: TrainingConfig,
    pub author: String,
    pub website: String,
}

/// The training job orchestration engine.
///
/// Owns the job registry and the filesystem layout, and spawns one pipeline
/// worker per submitted job. Submission is non-blocking: it validates,
/// registers the job and returns immediately; all pipeline work happens on
/// the worker task. Must be used within a Tokio runtime.
pub struct TrainingEngine {
    registry: Arc<JobRegistry>,
    layout: EngineLayout,
    settings: EngineSettings,
}

impl TrainingEngine {
    pub fn new(settings: EngineSettings) -> EngineResult<Self> {
        let layout = EngineLayout::new(settings.base_dir.clone());
        layout.initialize()?;
        Ok(Self {
            registry: Arc::new(JobRegistry::with_retention(settings.max_retained_jobs)),
            layout,
            settings,
        })
    }

    pub fn layout(&self) -> &EngineLayout {
        &self.layout
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Validate and register a new training job, then start its pipeline
    /// worker. Returns the initial snapshot; rejected submissions never
    /// create a job.
    pub fn submit_job(&self, request: SubmitRequest) -> EngineResult<JobSnapshot> {
        let wake_word = request.wake_word.trim().to_lowercase();
        if wake_word.is_empty() {
            return Err(EngineError::Validation("Wake word is required".to_string()));
        }

        let author = request.author.trim().to_string();
        if author.is_empty() {
            return Err(EngineError::Validation(
                "Author name is required".to_string(),
            ));
        }

        let length = wake_word.chars().count();
        if !(2..=50).contains(&length) {
            return Err(EngineError::Validation(
                "Wake word must be 2-50 characters".to_string(),
            ));
        }

        let website = request.website.trim().to_string();
        let method = TrainingMethod::parse(&request.method);

        let snapshot = self.registry.create(
            &wake_word,
            method,
            request.config.clone(),
            &author,
            &website,
        );
        log::info!(
            "Submitted training job {} for wake word \"{}\" using {}",
            snapshot.job_id,
            wake_word,
            method
        );

        let context = PipelineContext {
            registry: self.registry.clone(),
            layout: self.layout.clone(),
            settings: self.settings.clone(),
            job_id: snapshot.job_id.clone(),
            wake_word,
            author,
            website,
            config: request.config,
        };
        tokio::spawn(pipeline::run_job(context, method));

        Ok(snapshot)
    }

    pub fn get_job(&self, job_id: &str) -> EngineResult<JobSnapshot> {
        self.registry
            .get(job_id)
            .ok_or_else(|| EngineError::NotFound(format!("Job not found: {}", job_id)))
    }

    /// All jobs, newest first.
    pub fn list_jobs(&self) -> Vec<JobSnapshot> {
        self.registry.list()
    }

    /// Current snapshot plus a stream of subsequent updates.
    pub fn subscribe(&self, job_id: &str) -> EngineResult<JobSubscription> {
        self.registry
            .subscribe(job_id)
            .ok_or_else(|| EngineError::NotFound(format!("Job not found: {}", job_id)))
    }

    /// Bundle the trained model and manifest for a successfully completed
    /// job into a downloadable archive.
    pub fn package_for_download(&self, job_id: &str) -> EngineResult<ModelPackage> {
        let snapshot = self.get_job(job_id)?;
        if snapshot.status != JobStatus::Completed {
            return Err(EngineError::NotReady(
                "Model not ready - training not complete".to_string(),
            ));
        }

        let model_id = snapshot.wake_word.replace(' ', "_");
        artifacts::package_model(&self.layout.job_dir(job_id), &model_id)
    }
}
