use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::stack::CommandRunner;
use super::gguf::{is_gguf_file, is_lfs_pointer, read_header};
use super::modelfile::render_modelfile;
use super::naming::normalize_model_name;
use super::ImportError;

/// Registers a model with the inference server from a Modelfile.
#[async_trait]
pub trait ModelCreator: Send + Sync {
    async fn create(&self, name: &str, modelfile: &Path) -> Result<(), ImportError>;
}

/// Creates models with `ollama create <name> -f <modelfile>`.
pub struct OllamaCliCreator {
    runner: Arc<dyn CommandRunner>,
    binary: String,
}

impl OllamaCliCreator {
    pub fn new(runner: Arc<dyn CommandRunner>, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ModelCreator for OllamaCliCreator {
    async fn create(&self, name: &str, modelfile: &Path) -> Result<(), ImportError> {
        let args = vec![
            "create".to_string(),
            name.to_string(),
            "-f".to_string(),
            modelfile.to_string_lossy().into_owned(),
        ];
        let outcome = self.runner.output(&self.binary, &args, modelfile.parent()).await?;
        if outcome.success() {
            Ok(())
        } else {
            Err(ImportError::CreateFailed {
                name: name.to_string(),
                code: outcome.code,
                stderr: outcome.stderr.trim().to_string(),
            })
        }
    }
}

/// A model file registered under `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedModel {
    pub file: PathBuf,
    pub name: String,
}

/// A model file that could not be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub file: PathBuf,
    pub reason: String,
}

/// Outcome of one pass over the models directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: Vec<ImportedModel>,
    pub failed: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// One line summary printed at the end of an import.
    pub fn summary(&self) -> String {
        format!(
            "Imported {} model{}, {} failed",
            self.imported_count(),
            if self.imported_count() == 1 { "" } else { "s" },
            self.failed_count()
        )
    }
}

/// Regular, non-hidden `*.gguf` files (any case) in `dir`, sorted by name.
pub fn find_model_files(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    if !dir.is_dir() {
        return Err(ImportError::DirectoryMissing(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() &&
            !path.file_name().map_or(true, |name| name.to_string_lossy().starts_with('.')) &&
            path.extension().map_or(false, |ext| ext.to_string_lossy().eq_ignore_ascii_case("gguf"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Registers every GGUF file in `dir` through `creator`.
///
/// Each file gets a temporary Modelfile in the system temp directory, with
/// an absolute `FROM` path, removed once the create call returns. `dir`
/// itself is only read, so it may be mounted read-only. A failing file is
/// recorded and the loop moves on.
pub async fn import_models(dir: &Path, creator: &dyn ModelCreator) -> Result<ImportReport, ImportError> {
    let files = find_model_files(dir)?;
    let scratch_dir = std::env::temp_dir();
    let mut report = ImportReport::default();

    let total = files.len();
    if total == 0 {
        info!("No GGUF model files found in {}", dir.display());
        return Ok(report);
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    for (i, path) in files.iter().enumerate() {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        pb.set_message(format!("Importing {}... ({}/{})", filename, i + 1, total));

        match import_one(path, &scratch_dir, creator).await {
            Ok(name) => {
                info!("Imported {} as {}", filename, name);
                if report.imported.iter().any(|m| m.name == name) {
                    warn!("{} replaced an earlier import named {}", filename, name);
                }
                report.imported.push(ImportedModel { file: path.clone(), name });
            }
            Err(e) => {
                error!("Failed to import {}: {}", filename, e);
                report.failed.push(ImportFailure {
                    file: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    pb.finish_with_message(report.summary());
    Ok(report)
}

async fn import_one(
    path: &Path,
    scratch_dir: &Path,
    creator: &dyn ModelCreator,
) -> Result<String, ImportError> {
    if !is_gguf_file(path) {
        if is_lfs_pointer(path) {
            return Err(ImportError::LfsPointer(path.to_path_buf()));
        }
        return Err(ImportError::NotGguf(path.to_path_buf()));
    }
    let header = read_header(path)?;
    debug!(
        "{}: GGUF v{}, {} tensors, {} metadata entries",
        path.display(),
        header.version,
        header.tensor_count,
        header.metadata_kv_count
    );

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = normalize_model_name(&stem);

    let source = fs::canonicalize(path)?;
    let modelfile = scratch_dir.join(format!("llamabox-{}.Modelfile", Uuid::new_v4()));
    fs::write(&modelfile, render_modelfile(&source.to_string_lossy()))?;

    let result = creator.create(&name, &modelfile).await;

    if let Err(e) = fs::remove_file(&modelfile) {
        warn!("Could not remove {}: {}", modelfile.display(), e);
    }

    result.map(|_| name)
}
