// Engine error taxonomy
use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad submission input. Never creates a job.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("job not found: {0}")]
    NotFound(String),

    /// A required local asset is absent. Fatal for the job, no retry.
    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    /// An external executable exited non-zero. Carries the full captured
    /// output for diagnostics.
    #[error("{command} exited with code {exit_code}: {stderr}")]
    ProcessFailure {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// An external call exceeded its stage-specific budget.
    #[error("{command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    /// An HTTP dependency could not be reached at all.
    #[error("failed to connect to service at {url}: {detail}")]
    ServiceUnreachable { url: String, detail: String },

    /// An HTTP dependency answered with a non-2xx status.
    #[error("service at {url} returned status {status}: {body}")]
    ServiceError {
        url: String,
        status: u16,
        body: String,
    },

    /// Expected output missing after a nominally successful stage.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Requested an artifact of a job that has not completed successfully.
    #[error("not ready: {0}")]
    NotReady(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}
