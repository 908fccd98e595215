//! Container lifecycle control over Docker Compose.

use std::path::PathBuf;

use thiserror::Error;

mod compose;
mod entrypoint;
mod lifecycle;
mod probe;
mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use compose::{Compose, ComposeFlavor};
pub use entrypoint::{container_start, supervise, ShutdownSignal};
pub use lifecycle::{Stack, StackStatus};
pub use probe::ReadinessProbe;
pub use runner::{CommandOutcome, CommandRunner, SystemRunner};

/// Errors from driving Docker, Compose or the readiness probes.
#[derive(Debug, Error)]
pub enum StackError {
    #[error("Docker is not installed or not on PATH")]
    DockerMissing,
    #[error("Neither `docker compose` nor `docker-compose` is available")]
    ComposeMissing,
    #[error("Compose file not found: {}", .0.display())]
    ComposeFileMissing(PathBuf),
    #[error("`{0}` was not found on PATH")]
    ProgramNotFound(String),
    #[error("`{command}` failed ({})", describe_exit(.code))]
    CommandFailed { command: String, code: Option<i32> },
    #[error("{url} did not become ready after {attempts} attempts")]
    NotReady { url: String, attempts: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl StackError {
    /// Exit code the CLI should end with for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            StackError::CommandFailed { code: Some(code), .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}
