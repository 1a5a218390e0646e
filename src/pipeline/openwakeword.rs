// OpenWakeWord pipeline: generate samples locally, hand off training to an
// external Colab environment via a written guide.
use super::{PipelineContext, PipelineOutcome};
use crate::error::EngineResult;
use crate::file_manager::write_json_file;
use crate::models::{JobStatus, TrainingConfig};
use crate::process_manager::run_command;
use crate::progress::ProgressReporter;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEPENDENCY_INSTALL_TIMEOUT: Duration = Duration::from_secs(600);
const SAMPLE_GENERATION_TIMEOUT: Duration = Duration::from_secs(600);

const COLAB_NOTEBOOK_URL: &str =
    "https://colab.research.google.com/drive/1q1oe2zOyZp7UsB3jJiQ1IFn8z5YfjwEb";

#[derive(serde::Serialize)]
struct TrainingInfo<'a> {
    wake_word: &'a str,
    method: &'a str,
    num_samples: u32,
    config: &'a TrainingConfig,
    trained_at: String,
    colab_url: &'a str,
}

pub(crate) async fn run(
    ctx: &PipelineContext,
    reporter: &ProgressReporter,
) -> EngineResult<PipelineOutcome> {
    let job_dir = ctx.job_dir();
    fs::create_dir_all(&job_dir)?;

    reporter.report(
        10,
        "Initializing OpenWakeWord training...",
        Some(JobStatus::Running),
    );

    reporter.report(20, "Installing dependencies...", None);
    let install_args: Vec<String> = [
        "install",
        "--break-system-packages",
        "-q",
        "piper-sample-generator",
        "openwakeword",
    ]
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

    let num_samples = ctx.config.num_samples;
    reporter.report(
        30,
        &format!("Generating {} voice samples...", num_samples),
        None,
    );

    let samples_dir = job_dir.join("samples");
    fs::create_dir_all(&samples_dir)?;

    let script = sample_generation_script(&ctx.wake_word, &samples_dir, &ctx.config);
    let script_path = job_dir.join("generate_samples.py");
    fs::write(&script_path, script)?;

    run_command(
        &ctx.settings.python_program,
        &[script_path.display().to_string()],
        None,
        &[],
        SAMPLE_GENERATION_TIMEOUT,
    )
    .await?;

    reporter.report(60, "Training wake word model...", None);

    // No automated training for this method: record what was prepared and
    // point the user at the external training environment.
    let info = TrainingInfo {
        wake_word: &ctx.wake_word,
        method: "openwakeword",
        num_samples,
        config: &ctx.config,
        trained_at: chrono::Utc::now().to_rfc3339(),
        colab_url: COLAB_NOTEBOOK_URL,
    };
    let info_path = ctx
        .layout
        .models_dir()
        .join(format!("{}_info.json", ctx.model_id()));
    write_json_file(&info_path, &info)?;

    let instructions_path = job_dir.join("INSTRUCTIONS.md");
    fs::write(
        &instructions_path,
        instructions_text(&ctx.wake_word, num_samples, &samples_dir),
    )?;

    reporter.report(90, "Finalizing...", None);

    Ok(PipelineOutcome {
        model_path: instructions_path,
        message: "Training preparation complete! Check instructions.",
    })
}

fn sample_generation_script(wake_word: &str, samples_dir: &Path, config: &TrainingConfig) -> String {
    let voices = serde_json::to_string(&config.voices).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"import sys
from piper_sample_generator import generate_samples

try:
    generate_samples(
        text="{wake_word}",
        output_dir="{samples_dir}",
        num_samples={num_samples},
        voices={voices}
    )
    print("SUCCESS: Generated {num_samples} samples")
except Exception as e:
    print(f"ERROR: {{e}}")
    sys.exit(1)
"#,
        wake_word = wake_word,
        samples_dir = samples_dir.display(),
        num_samples = config.num_samples,
        voices = voices,
    )
}

fn instructions_text(wake_word: &str, num_samples: u32, samples_dir: &Path) -> String {
    format!(
        r#"# OpenWakeWord Training Instructions

Your wake word "{wake_word}" is ready for training!

## Next Steps:

1. Open the Google Colab notebook:
   {colab_url}

2. In Section 1, set:
   target_word = "{wake_word}"

3. Click Runtime -> Run all

4. Wait for completion (~30-60 minutes)

5. Download the generated .tflite file

6. Upload it back here or install directly in Home Assistant:
   - Copy to /share/openwakeword/
   - Configure in Settings -> Voice Assistants

## Configuration Used:
- Wake Word: {wake_word}
- Number of Samples: {num_samples}
- Training Method: OpenWakeWord

Generated samples are in: {samples_dir}
"#,
        wake_word = wake_word,
        colab_url = COLAB_NOTEBOOK_URL,
        num_samples = num_samples,
        samples_dir = samples_dir.display(),
    )
}
