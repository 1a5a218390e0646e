// Filesystem layout for engine data
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory layout rooted at a configurable base directory.
///
/// Instance-based (rather than process-global) so tests can root a fresh
/// layout in a temporary directory.
#[derive(Debug, Clone)]
pub struct EngineLayout {
    base_dir: PathBuf,
}

impl EngineLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Default base directory under the platform data dir.
    pub fn default_base_dir() -> PathBuf {
        let base_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        base_dir.join("wakeforge")
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Where finished models and training info files live.
    pub fn models_dir(&self) -> PathBuf {
        self.base_dir.join("models")
    }

    pub fn training_jobs_dir(&self) -> PathBuf {
        self.base_dir.join("training_jobs")
    }

    /// Local microWakeWord checkout required by the automated pipeline.
    /// Provisioned externally; the engine only checks for its presence.
    pub fn microwakeword_dir(&self) -> PathBuf {
        self.base_dir.join("microWakeWord")
    }

    /// Working directory for one job.
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.training_jobs_dir().join(job_id)
    }

    /// Create the directories the engine owns.
    pub fn initialize(&self) -> io::Result<()> {
        for dir in [self.models_dir(), self.training_jobs_dir()] {
            if !dir.exists() {
                fs::create_dir_all(&dir)?;
                log::debug!("Created directory: {:?}", dir);
            }
        }
        Ok(())
    }
}
