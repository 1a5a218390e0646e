// Model artifact resolution and packaging
use crate::error::{EngineError, EngineResult};
use crate::file_manager::write_json_file;
use crate::models::ModelManifest;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

/// Ordered candidate locations for the trained model under a job directory.
/// The training tool has produced two directory layouts across versions;
/// `model.tflite` covers manually placed models. First existing wins.
fn model_candidates(job_dir: &Path, model_id: &str) -> [PathBuf; 3] {
    let trained = job_dir.join("trained_models").join(model_id);
    [
        trained
            .join("tflite_stream_state_internal_quant")
            .join("stream_state_internal_quant.tflite"),
        trained.join("stream_state_internal_quant.tflite"),
        job_dir.join("model.tflite"),
    ]
}

fn manifest_candidates(job_dir: &Path, model_id: &str) -> [PathBuf; 3] {
    let trained = job_dir.join("trained_models").join(model_id);
    let file_name = format!("{}.json", model_id);
    [
        trained
            .join("tflite_stream_state_internal_quant")
            .join(&file_name),
        trained.join(&file_name),
        job_dir.join(&file_name),
    ]
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.exists()).cloned()
}

/// Locate the trained model file for a job. Read-only probing.
pub fn resolve_model(job_dir: &Path, model_id: &str) -> Option<PathBuf> {
    first_existing(&model_candidates(job_dir, model_id))
}

/// Locate the deployment manifest for a job. Read-only probing.
pub fn resolve_manifest(job_dir: &Path, model_id: &str) -> Option<PathBuf> {
    first_existing(&manifest_candidates(job_dir, model_id))
}

/// Write the deployment manifest next to the resolved model file.
///
/// Deterministic for a given manifest value: re-invocation overwrites with
/// byte-identical content.
pub fn generate_manifest(manifest: &ModelManifest, model_path: &Path) -> EngineResult<PathBuf> {
    let parent = model_path.parent().ok_or_else(|| {
        EngineError::ArtifactNotFound(format!(
            "model path has no parent directory: {}",
            model_path.display()
        ))
    })?;

    let manifest_path = parent.join(format!("{}.json", manifest.wake_word));
    write_json_file(&manifest_path, manifest)?;
    log::info!("Generated JSON manifest: {:?}", manifest_path);
    Ok(manifest_path)
}

/// A downloadable deployment package.
#[derive(Debug, Clone)]
pub struct ModelPackage {
    /// Suggested download file name.
    pub file_name: String,
    /// Zip archive bytes.
    pub bytes: Vec<u8>,
}

/// Bundle the resolved model and manifest into a zip archive with exactly
/// two entries, `<model_id>.tflite` and `<model_id>.json`.
pub fn package_model(job_dir: &Path, model_id: &str) -> EngineResult<ModelPackage> {
    let model_path = resolve_model(job_dir, model_id).ok_or_else(|| {
        EngineError::ArtifactNotFound("model file not found in training output".to_string())
    })?;
    let manifest_path = resolve_manifest(job_dir, model_id).ok_or_else(|| {
        EngineError::ArtifactNotFound("JSON manifest not found in training output".to_string())
    })?;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(format!("{}.tflite", model_id), options)?;
    zip.write_all(&std::fs::read(&model_path)?)?;

    zip.start_file(format!("{}.json", model_id), options)?;
    zip.write_all(&std::fs::read(&manifest_path)?)?;

    let cursor = zip.finish()?;
    Ok(ModelPackage {
        file_name: format!("{}_esphome.zip", model_id),
        bytes: cursor.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrainingConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_model_probes_candidates_in_order() {
        let temp = TempDir::new().unwrap();
        let job_dir = temp.path();

        assert!(resolve_model(job_dir, "hey_computer").is_none());

        // Lowest-priority candidate first.
        fs::write(job_dir.join("model.tflite"), b"fallback").unwrap();
        let resolved = resolve_model(job_dir, "hey_computer").unwrap();
        assert_eq!(resolved, job_dir.join("model.tflite"));

        let flat = job_dir.join("trained_models").join("hey_computer");
        fs::create_dir_all(&flat).unwrap();
        fs::write(flat.join("stream_state_internal_quant.tflite"), b"flat").unwrap();
        let resolved = resolve_model(job_dir, "hey_computer").unwrap();
        assert_eq!(resolved, flat.join("stream_state_internal_quant.tflite"));

        // The quantized-subdirectory layout wins over both.
        let nested = flat.join("tflite_stream_state_internal_quant");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("stream_state_internal_quant.tflite"), b"nested").unwrap();
        let resolved = resolve_model(job_dir, "hey_computer").unwrap();
        assert_eq!(resolved, nested.join("stream_state_internal_quant.tflite"));
    }

    #[test]
    fn test_generate_manifest_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let model_path = temp.path().join("stream_state_internal_quant.tflite");
        fs::write(&model_path, b"model").unwrap();

        let manifest = ModelManifest::new("ok_atlas", "alice", "", &TrainingConfig::default());
        let first = generate_manifest(&manifest, &model_path).unwrap();
        let first_bytes = fs::read(&first).unwrap();

        let second = generate_manifest(&manifest, &model_path).unwrap();
        let second_bytes = fs::read(&second).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
        assert_eq!(first, temp.path().join("ok_atlas.json"));
    }

    #[test]
    fn test_package_model_contains_exactly_two_renamed_entries() {
        let temp = TempDir::new().unwrap();
        let job_dir = temp.path();
        let out_dir = job_dir
            .join("trained_models")
            .join("hey_computer")
            .join("tflite_stream_state_internal_quant");
        fs::create_dir_all(&out_dir).unwrap();
        fs::write(out_dir.join("stream_state_internal_quant.tflite"), b"model-bytes").unwrap();
        fs::write(out_dir.join("hey_computer.json"), b"{}").unwrap();

        let package = package_model(job_dir, "hey_computer").unwrap();
        assert_eq!(package.file_name, "hey_computer_esphome.zip");

        let mut archive = zip::ZipArchive::new(Cursor::new(package.bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"hey_computer.tflite".to_string()));
        assert!(names.contains(&"hey_computer.json".to_string()));
    }

    #[test]
    fn test_package_model_requires_both_artifacts() {
        let temp = TempDir::new().unwrap();
        let job_dir = temp.path();

        let err = package_model(job_dir, "hey_computer").unwrap_err();
        assert!(matches!(err, EngineError::ArtifactNotFound(_)));

        // Model alone is not enough.
        fs::write(job_dir.join("model.tflite"), b"model").unwrap();
        let err = package_model(job_dir, "hey_computer").unwrap_err();
        match err {
            EngineError::ArtifactNotFound(detail) => assert!(detail.contains("manifest")),
            other => panic!("expected ArtifactNotFound, got {:?}", other),
        }
    }
}
