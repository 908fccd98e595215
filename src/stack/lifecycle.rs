use colored::*;
use tracing::{info, warn};

use crate::ollama::OllamaClient;
use super::compose::Compose;
use super::probe::ReadinessProbe;
use super::StackError;

/// What `status` found, beyond the `ps` table it prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackStatus {
    pub ollama_ready: bool,
    pub webui_ready: bool,
    /// Models listed by Ollama, when it could be asked
    pub model_count: Option<usize>,
}

/// Start/stop/status control over the compose stack.
pub struct Stack {
    compose: Compose,
    probe: ReadinessProbe,
    ollama_url: String,
    webui_url: String,
}

impl Stack {
    pub fn new(
        compose: Compose,
        probe: ReadinessProbe,
        ollama_url: impl Into<String>,
        webui_url: impl Into<String>,
    ) -> Self {
        let ollama_url: String = ollama_url.into();
        Self {
            compose,
            probe,
            ollama_url: ollama_url.trim_end_matches('/').to_string(),
            webui_url: webui_url.into(),
        }
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.ollama_url)
    }

    /// Brings the containers up and waits for both endpoints.
    pub async fn start(&self) -> Result<(), StackError> {
        println!("{}", "Starting containers...".cyan());
        self.compose.up().await?;

        self.probe.wait_until_ready("Ollama", &self.tags_url()).await?;
        self.probe.wait_until_ready("Web UI", &self.webui_url).await?;

        println!("\n{}", "Stack is up".bright_green().bold());
        println!("  Ollama API: {}", self.ollama_url.yellow());
        println!("  Web UI:     {}", self.webui_url.yellow());
        info!("Stack started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), StackError> {
        println!("{}", "Stopping containers...".cyan());
        self.compose.down().await?;
        println!("{}", "Containers stopped".bright_green());
        info!("Stack stopped");
        Ok(())
    }

    pub async fn restart(&self) -> Result<(), StackError> {
        self.stop().await?;
        self.start().await
    }

    /// Prints container state and probes each endpoint once.
    ///
    /// Unreachable endpoints are reported, not treated as failures.
    pub async fn status(&self) -> Result<StackStatus, StackError> {
        self.compose.ps().await?;

        let ollama_ready = self.probe.check(&self.tags_url()).await;
        let webui_ready = self.probe.check(&self.webui_url).await;

        println!();
        print_endpoint("Ollama API", &self.ollama_url, ollama_ready);
        print_endpoint("Web UI", &self.webui_url, webui_ready);

        let model_count = if ollama_ready {
            match OllamaClient::new(self.ollama_url.clone()) {
                Ok(client) => match client.list_models().await {
                    Ok(models) => Some(models.len()),
                    Err(e) => {
                        warn!("Could not list models: {}", e);
                        None
                    }
                },
                Err(e) => {
                    warn!("Could not build Ollama client: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if let Some(count) = model_count {
            println!("  Models:     {}", count.to_string().bright_green());
        }

        Ok(StackStatus {
            ollama_ready,
            webui_ready,
            model_count,
        })
    }

    pub async fn logs(&self, follow: bool, tail: u32, service: Option<&str>) -> Result<(), StackError> {
        self.compose.logs(follow, tail, service).await
    }
}

fn print_endpoint(name: &str, url: &str, ready: bool) {
    let mark = if ready { "✓ up".bright_green() } else { "✗ down".red() };
    println!("  {:<11} {} ({})", format!("{}:", name), mark, url);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use crate::stack::compose::ComposeFlavor;
    use crate::stack::testing::RecordingRunner;

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    fn stack(runner: Arc<RecordingRunner>) -> Stack {
        let port = closed_port();
        let compose = Compose::new(runner, ComposeFlavor::Plugin, "docker-compose.yml", ".");
        let probe = ReadinessProbe::new(2, Duration::from_millis(5)).unwrap().quiet();
        Stack::new(
            compose,
            probe,
            format!("http://127.0.0.1:{}", port),
            format!("http://127.0.0.1:{}", port),
        )
    }

    #[tokio::test]
    async fn test_stop_with_nothing_running_succeeds() {
        let runner = Arc::new(RecordingRunner::succeeding());
        stack(runner.clone()).stop().await.unwrap();
        assert_eq!(runner.calls(), vec!["docker compose -f docker-compose.yml down".to_string()]);
    }

    #[tokio::test]
    async fn test_start_fails_when_ollama_never_answers() {
        let runner = Arc::new(RecordingRunner::succeeding());
        let err = stack(runner.clone()).start().await.unwrap_err();

        assert!(matches!(err, StackError::NotReady { attempts: 2, .. }));
        assert_eq!(runner.calls(), vec!["docker compose -f docker-compose.yml up -d".to_string()]);
    }

    #[tokio::test]
    async fn test_start_stops_at_failed_up() {
        let runner = Arc::new(
            RecordingRunner::succeeding().fail_when("docker compose -f docker-compose.yml up -d", 1),
        );
        let err = stack(runner).start().await.unwrap_err();
        assert!(matches!(err, StackError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_status_reports_down_endpoints_without_failing() {
        let runner = Arc::new(RecordingRunner::succeeding());
        let status = stack(runner).status().await.unwrap();

        assert_eq!(
            status,
            StackStatus { ollama_ready: false, webui_ready: false, model_count: None }
        );
    }

    #[tokio::test]
    async fn test_restart_runs_down_then_up() {
        let runner = Arc::new(RecordingRunner::succeeding());
        let _ = stack(runner.clone()).restart().await;

        let calls = runner.calls();
        assert_eq!(calls[0], "docker compose -f docker-compose.yml down");
        assert_eq!(calls[1], "docker compose -f docker-compose.yml up -d");
    }
}
