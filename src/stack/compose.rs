use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use super::runner::{CommandOutcome, CommandRunner};
use super::StackError;

/// Which compose front-end is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeFlavor {
    /// `docker compose` (v2 CLI plugin)
    Plugin,
    /// `docker-compose` (standalone v1 binary)
    Standalone,
}

/// Docker Compose wrapper bound to one compose file.
pub struct Compose {
    runner: Arc<dyn CommandRunner>,
    flavor: ComposeFlavor,
    file: PathBuf,
    project_dir: PathBuf,
}

impl Compose {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        flavor: ComposeFlavor,
        file: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            flavor,
            file: file.into(),
            project_dir: project_dir.into(),
        }
    }

    /// Checks that Docker is installed and picks the compose front-end.
    ///
    /// Missing Docker is fatal; the v2 plugin is preferred over the
    /// standalone binary.
    pub async fn detect(
        runner: Arc<dyn CommandRunner>,
        file: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
    ) -> Result<Self, StackError> {
        let file = file.into();
        if !file.is_file() {
            return Err(StackError::ComposeFileMissing(file));
        }

        match runner.output("docker", &args(&["--version"]), None).await {
            Ok(outcome) if outcome.success() => {}
            Ok(_) | Err(StackError::ProgramNotFound(_)) => return Err(StackError::DockerMissing),
            Err(e) => return Err(e),
        }

        let flavor = if probe(runner.as_ref(), "docker", &["compose", "version"]).await {
            ComposeFlavor::Plugin
        } else if probe(runner.as_ref(), "docker-compose", &["--version"]).await {
            warn!("Using standalone docker-compose; the docker compose plugin was not found");
            ComposeFlavor::Standalone
        } else {
            return Err(StackError::ComposeMissing);
        };

        info!("Compose front-end: {:?}, file: {}", flavor, file.display());
        Ok(Self::new(runner, flavor, file, project_dir))
    }

    pub fn flavor(&self) -> ComposeFlavor {
        self.flavor
    }

    /// Program and full argument list for a compose subcommand.
    pub fn invocation(&self, subcommand: &[String]) -> (String, Vec<String>) {
        let (program, mut full) = match self.flavor {
            ComposeFlavor::Plugin => ("docker", vec!["compose".to_string()]),
            ComposeFlavor::Standalone => ("docker-compose", Vec::new()),
        };
        full.push("-f".to_string());
        full.push(self.file.to_string_lossy().into_owned());
        full.extend(subcommand.iter().cloned());
        (program.to_string(), full)
    }

    async fn run(&self, subcommand: Vec<String>) -> Result<(), StackError> {
        let (program, full) = self.invocation(&subcommand);
        let outcome = self.runner.status(&program, &full, Some(&self.project_dir)).await?;
        check(&program, &full, &outcome)
    }

    /// `up -d`
    pub async fn up(&self) -> Result<(), StackError> {
        self.run(args(&["up", "-d"])).await
    }

    /// `down`; succeeds when nothing is running.
    pub async fn down(&self) -> Result<(), StackError> {
        self.run(args(&["down"])).await
    }

    /// `ps`, printed to the terminal.
    pub async fn ps(&self) -> Result<(), StackError> {
        self.run(args(&["ps"])).await
    }

    /// `logs --tail N [--follow] [service]`
    pub async fn logs(&self, follow: bool, tail: u32, service: Option<&str>) -> Result<(), StackError> {
        let mut subcommand = args(&["logs", "--tail"]);
        subcommand.push(tail.to_string());
        if follow {
            subcommand.push("--follow".to_string());
        }
        if let Some(service) = service {
            subcommand.push(service.to_string());
        }
        self.run(subcommand).await
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

async fn probe(runner: &dyn CommandRunner, program: &str, parts: &[&str]) -> bool {
    matches!(runner.output(program, &args(parts), None).await, Ok(outcome) if outcome.success())
}

fn check(program: &str, full: &[String], outcome: &CommandOutcome) -> Result<(), StackError> {
    if outcome.success() {
        Ok(())
    } else {
        Err(StackError::CommandFailed {
            command: format!("{} {}", program, full.join(" ")),
            code: outcome.code,
        })
    }
}
