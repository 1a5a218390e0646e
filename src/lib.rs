// Wake word training job orchestration engine.
//
// Tracks training requests through a staged pipeline that shells out to
// external sample-generation, dataset-download and model-training tools,
// streams progress to subscribers, and packages the produced model for
// deployment. Transport (HTTP/WebSocket) and the ML tools themselves live
// outside this crate.

pub mod artifacts;
pub mod engine;
pub mod error;
pub mod file_manager;
pub mod models;
pub mod process_manager;
pub mod progress;
pub mod registry;
pub mod utils;

mod pipeline;

pub use engine::{EngineSettings, SubmitRequest, TrainingEngine};
pub use error::{EngineError, EngineResult};
pub use models::{JobSnapshot, JobStatus, TrainingConfig, TrainingMethod};
pub use registry::{JobRegistry, JobSubscription};
