use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use super::runner::{CommandOutcome, CommandRunner};
use super::StackError;

/// Runner that records command lines instead of spawning anything.
///
/// Every command succeeds unless its full command line was registered with
/// `fail_when`, or its program with `missing`.
#[derive(Default)]
pub(crate) struct RecordingRunner {
    failures: HashMap<String, i32>,
    missing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub(crate) fn succeeding() -> Self {
        Self::default()
    }

    pub(crate) fn fail_when(mut self, command_line: &str, code: i32) -> Self {
        self.failures.insert(command_line.to_string(), code);
        self
    }

    pub(crate) fn missing(mut self, program: &str) -> Self {
        self.missing.insert(program.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, program: &str, args: &[String]) -> Result<CommandOutcome, StackError> {
        let line = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };
        self.calls.lock().unwrap().push(line.clone());

        if self.missing.contains(program) {
            return Err(StackError::ProgramNotFound(program.to_string()));
        }
        match self.failures.get(&line) {
            Some(code) => Ok(CommandOutcome {
                code: Some(*code),
                stdout: String::new(),
                stderr: format!("{} failed", program),
            }),
            None => Ok(CommandOutcome {
                code: Some(0),
                ..Default::default()
            }),
        }
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn status(&self, program: &str, args: &[String], _cwd: Option<&Path>) -> Result<CommandOutcome, StackError> {
        self.respond(program, args)
    }

    async fn output(&self, program: &str, args: &[String], _cwd: Option<&Path>) -> Result<CommandOutcome, StackError> {
        self.respond(program, args)
    }
}
