use std::io::ErrorKind;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::StackError;

/// Exit code and captured output of an external command.
///
/// `stdout`/`stderr` are empty when the command ran with inherited stdio.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            ..Default::default()
        }
    }
}

/// Seam over process spawning so the lifecycle and import logic can be
/// exercised without Docker or Ollama installed.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command with the terminal attached and waits for it.
    async fn status(&self, program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutcome, StackError>;

    /// Runs the command with stdout/stderr captured.
    async fn output(&self, program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutcome, StackError>;
}

/// Runs real processes through `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(program: &str, args: &[String], cwd: Option<&Path>) -> Command {
        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        command
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> StackError {
    if e.kind() == ErrorKind::NotFound {
        StackError::ProgramNotFound(program.to_string())
    } else {
        StackError::Io(e)
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn status(&self, program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutcome, StackError> {
        debug!("Running {} {}", program, args.join(" "));
        let status = Self::command(program, args, cwd)
            .status()
            .await
            .map_err(|e| spawn_error(program, e))?;
        Ok(CommandOutcome::from_status(status))
    }

    async fn output(&self, program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutcome, StackError> {
        debug!("Running {} {} (captured)", program, args.join(" "));
        let output = Self::command(program, args, cwd)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| spawn_error(program, e))?;
        Ok(CommandOutcome {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
