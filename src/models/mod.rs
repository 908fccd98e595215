//! Registering local GGUF files with the inference server.

use std::path::PathBuf;

use thiserror::Error;

use crate::stack::StackError;

mod gguf;
mod import;
mod modelfile;
mod naming;

pub use gguf::{is_gguf_file, is_lfs_pointer, read_header, GgufHeader, GGUF_MAGIC};
pub use import::{
    find_model_files, import_models, ImportFailure, ImportReport, ImportedModel, ModelCreator,
    OllamaCliCreator,
};
pub use modelfile::{render_modelfile, STOP_TOKENS};
pub use naming::{normalize_model_name, FALLBACK_NAME};

/// Errors from importing model files.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Models directory not found: {}", .0.display())]
    DirectoryMissing(PathBuf),
    #[error("{} is not a GGUF file", .0.display())]
    NotGguf(PathBuf),
    #[error("{} is a Git LFS pointer; run `git lfs pull` to fetch the model", .0.display())]
    LfsPointer(PathBuf),
    #[error("creating model '{name}' failed (exit code {code:?}): {stderr}")]
    CreateFailed {
        name: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error(transparent)]
    Stack(#[from] StackError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
