use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, Command};
#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::models::{import_models, OllamaCliCreator};
use super::probe::ReadinessProbe;
use super::runner::SystemRunner;
use super::StackError;

/// Resolves on SIGINT, or on SIGTERM where the platform has it.
///
/// The SIGTERM handler is installed on construction, so a signal that
/// arrives before `recv` is polled is not lost. Inside a container this
/// process is PID 1, which the kernel never terminates on an unhandled
/// SIGTERM.
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: Signal,
}

impl ShutdownSignal {
    pub fn install() -> Result<Self, StackError> {
        Ok(Self {
            #[cfg(unix)]
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(unix)]
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
            _ = self.terminate.recv() => info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl-C");
    }
}

/// Waits on the server until it exits or `shutdown` resolves.
///
/// Returns the server's exit code, or 0 once a shutdown request has killed
/// and reaped it.
pub async fn supervise<F>(child: &mut Child, shutdown: F) -> Result<i32, StackError>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        status = child.wait() => {
            let status = status?;
            info!("Inference server exited with {}", status);
            Ok(status.code().unwrap_or(1))
        }
        _ = shutdown => {
            info!("Stopping inference server");
            child.kill().await?;
            Ok(0)
        }
    }
}

/// Container entrypoint: runs `ollama serve`, imports the bundled models once
/// it answers, then waits on the server.
///
/// Returns the server's exit code. If the server never becomes ready it is
/// killed and the readiness error is returned.
pub async fn container_start(settings: &Settings) -> Result<i32, StackError> {
    let mut shutdown = ShutdownSignal::install()?;

    let binary = &settings.stack.ollama_binary;
    info!("Launching {} serve", binary);
    println!("Starting inference server...");

    let mut child = Command::new(binary)
        .arg("serve")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StackError::ProgramNotFound(binary.clone()),
            _ => StackError::Io(e),
        })?;

    let startup = async {
        let probe = ReadinessProbe::from_config(&settings.stack)?.quiet();
        let tags_url = format!("{}/api/tags", settings.ollama_url());
        probe.wait_until_ready("Ollama", &tags_url).await?;
        println!("Inference server is ready");

        let runner = Arc::new(SystemRunner);
        let creator = OllamaCliCreator::new(runner, binary.clone());
        match import_models(&settings.stack.models_dir, &creator).await {
            Ok(report) => {
                for failure in &report.failed {
                    eprintln!("  failed: {} ({})", failure.file.display(), failure.reason);
                }
                println!("{}", report.summary());
            }
            Err(e) => {
                warn!("Model import skipped: {}", e);
                eprintln!("Model import skipped: {}", e);
            }
        }
        Ok::<(), StackError>(())
    };

    tokio::select! {
        result = startup => {
            if let Err(e) = result {
                error!("Inference server not ready: {}", e);
                eprintln!("Inference server failed to start: {}", e);
                if let Err(kill_err) = child.kill().await {
                    warn!("Failed to stop inference server: {}", kill_err);
                }
                return Err(e);
            }
        }
        _ = shutdown.recv() => {
            info!("Shutdown requested during startup");
            child.kill().await?;
            return Ok(0);
        }
    }

    supervise(&mut child, shutdown.recv()).await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_supervise_returns_server_exit_code() {
        let mut child = Command::new("sh").args(["-c", "exit 3"]).spawn().unwrap();
        let code = supervise(&mut child, std::future::pending()).await.unwrap();
        assert_eq!(code, 3);
    }

    #[tokio::test]
    async fn test_supervise_kills_and_reaps_on_shutdown() {
        let mut child = Command::new("sleep").arg("30").kill_on_drop(true).spawn().unwrap();

        let code = supervise(&mut child, async {}).await.unwrap();

        assert_eq!(code, 0);
        assert!(child.try_wait().unwrap().is_some());
    }
}
