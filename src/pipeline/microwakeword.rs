// MicroWakeWord pipeline: fully automated end-to-end training against a
// local microWakeWord checkout plus an external feature-generation service.
use super::{PipelineContext, PipelineOutcome};
use crate::artifacts;
use crate::error::{EngineError, EngineResult};
use crate::file_manager::write_json_file;
use crate::models::{JobStatus, ModelManifest};
use crate::process_manager::{call_service, run_command};
use crate::progress::ProgressReporter;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEPENDENCY_INSTALL_TIMEOUT: Duration = Duration::from_secs(600);
const SAMPLE_GENERATION_TIMEOUT: Duration = Duration::from_secs(900);
const DATASET_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(3600);
const FEATURE_GENERATION_TIMEOUT: Duration = Duration::from_secs(3600);
const TRAINING_TIMEOUT: Duration = Duration::from_secs(14400);

const NEGATIVE_DATASET_REPO: &str = "kahrendt/microwakeword";

/// Reproducibility record written into the job directory.
#[derive(serde::Serialize)]
struct TrainingSetup<'a> {
    wake_word: &'a str,
    model_id: &'a str,
    positive_samples_dir: String,
    negative_datasets_dir: String,
    output_dir: String,
    epochs: u32,
    batch_size: u32,
    learning_rate: f64,
    probability_cutoff: f64,
    sliding_window_size: u32,
}

/// Parameter file consumed by `microwakeword.model_train_eval`.
#[derive(serde::Serialize)]
struct TrainerParameters {
    window_step_ms: u32,
    train_dir: String,
    features: Vec<FeatureSource>,
    training_steps: Vec<u32>,
    positive_class_weight: Vec<u32>,
    negative_class_weight: Vec<u32>,
    learning_rates: Vec<f64>,
    batch_size: u32,
    time_mask_max_size: Vec<u32>,
    time_mask_count: Vec<u32>,
    freq_mask_max_size: Vec<u32>,
    freq_mask_count: Vec<u32>,
    eval_step_interval: u32,
    clip_duration_ms: u32,
    target_minimization: f64,
    minimization_metric: Option<String>,
    maximization_metric: String,
}

pub(crate) async fn run(
    ctx: &PipelineContext,
    reporter: &ProgressReporter,
) -> EngineResult<PipelineOutcome> {
    reporter.report(
        10,
        "Initializing MicroWakeWord training...",
        Some(JobStatus::Running),
    );

    // The checkout is baked into the deployment image; without it the
    // automated path cannot work at all.
    let microwakeword_dir = ctx.layout.microwakeword_dir();
    if !microwakeword_dir.exists() {
        return Err(EngineError::PrerequisiteMissing(
            "microWakeWord directory not found. Please rebuild the Docker image.".to_string(),
        ));
    }

    let job_dir = ctx.job_dir();
    fs::create_dir_all(&job_dir)?;
    let model_id = ctx.model_id();

    let num_samples = ctx.config.num_samples;
    reporter.report(
        20,
        &format!("Generating {} voice samples...", num_samples),
        None,
    );

    let samples_dir = job_dir.join("samples").join("positive");
    fs::create_dir_all(&samples_dir)?;

    let generate_args = vec![
        ctx.settings.piper_generator_script.display().to_string(),
        ctx.wake_word.clone(),
        "--model".to_string(),
        ctx.settings.piper_voice_model.display().to_string(),
        "--max-samples".to_string(),
        num_samples.to_string(),
        "--output-dir".to_string(),
        samples_dir.display().to_string(),
    ];
    run_command(
        &ctx.settings.python_program,
        &generate_args,
        None,
        &[],
        SAMPLE_GENERATION_TIMEOUT,
    )
    .await?;

    reporter.report(30, "Downloading negative datasets...", None);

    let datasets_dir = job_dir.join("datasets");
    fs::create_dir_all(&datasets_dir)?;

    let download_path = job_dir.join("download.py");
    fs::write(&download_path, dataset_download_script(&datasets_dir))?;

    let install_args: Vec<String> = ["install", "--break-system-packages", "-q", "huggingface_hub"]
        .iter()
        .map(|a| a.to_string())
        .collect();
    run_command(
        &ctx.settings.pip_program,
        &install_args,
        None,
        &[],
        DEPENDENCY_INSTALL_TIMEOUT,
    )
    .await?;
    run_command(
        &ctx.settings.python_program,
        &[download_path.display().to_string()],
        None,
        &[],
        DATASET_DOWNLOAD_TIMEOUT,
    )
    .await?;

    reporter.report(50, "Creating training configuration...", None);

    let features_dir = format!("{}_features", samples_dir.display());
    let setup = TrainingSetup {
        wake_word: &ctx.wake_word,
        model_id: &model_id,
        positive_samples_dir: samples_dir.display().to_string(),
        negative_datasets_dir: datasets_dir.display().to_string(),
        output_dir: job_dir.join("models").display().to_string(),
        epochs: ctx.config.epochs,
        batch_size: ctx.config.batch_size,
        learning_rate: ctx.config.learning_rate,
        probability_cutoff: ctx.config.probability_cutoff,
        sliding_window_size: ctx.config.sliding_window_size,
    };
    write_json_file(&job_dir.join("training_config.json"), &setup)?;

    let parameters = trainer_parameters(ctx, &job_dir, &model_id, &features_dir);
    let parameters_path = job_dir.join("training_parameters.yaml");
    fs::write(&parameters_path, serde_yaml::to_string(&parameters)?)?;

    reporter.report(60, "Creating deployment instructions...", None);

    fs::write(
        job_dir.join("TRAINING_INSTRUCTIONS.md"),
        training_instructions(ctx, &microwakeword_dir, &job_dir),
    )?;
    fs::write(
        job_dir.join("esphome_config.yaml"),
        esphome_example(ctx, &model_id),
    )?;

    reporter.report(
        65,
        "Generating spectrograms from positive samples (this may take 10-15 minutes)...",
        None,
    );

    let service_url = format!(
        "{}/generate-features",
        ctx.settings.feature_generator_url.trim_end_matches('/')
    );
    log::info!("Calling feature generator service at {}", service_url);
    let response = call_service(
        &service_url,
        serde_json::json!({
            "samples_dir": samples_dir.display().to_string(),
            "output_dir": features_dir,
        }),
        FEATURE_GENERATION_TIMEOUT,
    )
    .await?;
    log::info!("Feature generation complete: {}", response.body);

    reporter.report(
        70,
        "Training neural network (GPU accelerated if available)...",
        None,
    );

    run_command(
        &ctx.settings.python_program,
        &trainer_args(&parameters_path),
        Some(&job_dir),
        &[
            ("TF_FORCE_GPU_ALLOW_GROWTH", "true"),
            ("CUDA_VISIBLE_DEVICES", "0"),
        ],
        TRAINING_TIMEOUT,
    )
    .await?;

    reporter.report(90, "Training complete! Locating model file...", None);

    let model_path = artifacts::resolve_model(&job_dir, &model_id).ok_or_else(|| {
        EngineError::ArtifactNotFound("model file not found after training".to_string())
    })?;

    reporter.report(95, "Generating deployment manifest...", None);

    let manifest = ModelManifest::new(&model_id, &ctx.author, &ctx.website, &ctx.config);
    artifacts::generate_manifest(&manifest, &model_path)?;

    Ok(PipelineOutcome {
        model_path,
        message: "Training complete! Model and JSON manifest ready for deployment.",
    })
}

fn dataset_download_script(datasets_dir: &Path) -> String {
    format!(
        r#"from huggingface_hub import snapshot_download

snapshot_download(
    repo_id="{repo}",
    repo_type="dataset",
    local_dir="{datasets_dir}",
    allow_patterns=["*.ragged", "*.json"]
)
"#,
        repo = NEGATIVE_DATASET_REPO,
        datasets_dir = datasets_dir.display(),
    )
}

fn trainer_parameters(
    ctx: &PipelineContext,
    job_dir: &Path,
    model_id: &str,
    features_dir: &str,
) -> TrainerParameters {
    TrainerParameters {
        window_step_ms: 10,
        train_dir: job_dir
            .join("trained_models")
            .join(model_id)
            .display()
            .to_string(),
        // TODO: fold the downloaded negative datasets into this list once
        // their ragged mmaps are converted to the trainer's feature layout.
        features: vec![FeatureSource {
            features_dir: features_dir.to_string(),
            sampling_weight: 1.0,
            penalty_weight: 1.0,
            truth: true,
            truncation_strategy: "truncate_start".to_string(),
            kind: "mmap".to_string(),
        }],
        training_steps: vec![1000],
        positive_class_weight: vec![1],
        negative_class_weight: vec![20],
        learning_rates: vec![ctx.config.learning_rate],
        batch_size: ctx.config.batch_size,
        time_mask_max_size: vec![0],
        time_mask_count: vec![0],
        freq_mask_max_size: vec![0],
        freq_mask_count: vec![0],
        eval_step_interval: 500,
        clip_duration_ms: 1500,
        target_minimization: 0.9,
        minimization_metric: None,
        maximization_metric: "average_viable_recall".to_string(),
    }
}

#[derive(serde::Serialize)]
struct FeatureSource {
    features_dir: String,
    sampling_weight: f64,
    penalty_weight: f64,
    truth: bool,
    truncation_strategy: String,
    #[serde(rename = "type")]
    kind: String,
}

/// CLI contract of the external trainer.
fn trainer_args(parameters_path: &Path) -> Vec<String> {
    [
        "-m",
        "microwakeword.model_train_eval",
        &format!("--training_config={}", parameters_path.display()),
        "--train",
        "1",
        "--restore_checkpoint",
        "1",
        "--test_tf_nonstreaming",
        "0",
        "--test_tflite_nonstreaming",
        "0",
        "--test_tflite_nonstreaming_quantized",
        "0",
        "--test_tflite_streaming",
        "0",
        "--test_tflite_streaming_quantized",
        "1",
        "--use_weights",
        "best_weights",
        "mixednet",
        "--pointwise_filters",
        "64,64,64,64",
        "--repeat_in_block",
        "1,1,1,1",
        "--mixconv_kernel_sizes",
        "[5],[7,11],[9,15],[23]",
        "--residual_connection",
        "0,0,0,0",
        "--first_conv_filters",
        "32",
        "--first_conv_kernel_size",
        "5",
        "--stride",
        "3",
    ]
    .iter()
    .map(|a| a.to_string())
    .collect()
}

fn training_instructions(ctx: &PipelineContext, microwakeword_dir: &Path, job_dir: &Path) -> String {
    format!(
        r#"# MicroWakeWord Training Instructions

Everything is prepared for training "{wake_word}"!

## Training Setup Complete:
- Samples generated: {num_samples}
- Negative datasets downloaded
- Configuration created

## To Re-run Training Manually:

### Option 1: Use Jupyter Notebook
1. Navigate to: {microwakeword_dir}/notebooks/
2. Open: basic_training_notebook.ipynb
3. Update the configuration with values from: {config_path}
4. Run all cells
5. Wait 2-4 hours for training

### Option 2: Command Line
```bash
cd {microwakeword_dir}
# Follow the training instructions in the repository
```

## Configuration:
- Wake Word: {wake_word}
- Samples: {num_samples}
- Epochs: {epochs}
- Batch Size: {batch_size}
- Learning Rate: {learning_rate}

## After Training:
You'll have:
- stream_state_internal_quant.tflite (model file)
- {model_id}.json (manifest)

Copy these to your Home Assistant ESPHome device!

Training data is in: {job_dir}
"#,
        wake_word = ctx.wake_word,
        num_samples = ctx.config.num_samples,
        microwakeword_dir = microwakeword_dir.display(),
        config_path = job_dir.join("training_config.json").display(),
        epochs = ctx.config.epochs,
        batch_size = ctx.config.batch_size,
        learning_rate = ctx.config.learning_rate,
        model_id = ctx.model_id(),
        job_dir = job_dir.display(),
    )
}

fn esphome_example(ctx: &PipelineContext, model_id: &str) -> String {
    format!(
        r#"# ESPHome Configuration for "{wake_word}"

micro_wake_word:
  microphone:
    microphone: mic  # Your microphone config
    channels: 0
    gain_factor: 4

  vad:
    model: github://esphome/micro-wake-word-models/models/v2/vad.json@main

  models:
    - model: github://yourusername/yourrepo/models/{model_id}.json
      id: {model_id}_model
      probability_cutoff: {probability_cutoff}
      sliding_window_size: {sliding_window_size}

  on_wake_word_detected:
    - voice_assistant.start:
        wake_word: !lambda return wake_word;
"#,
        wake_word = ctx.wake_word,
        model_id = model_id,
        probability_cutoff = ctx.config.probability_cutoff,
        sliding_window_size = ctx.config.sliding_window_size,
    )
}
