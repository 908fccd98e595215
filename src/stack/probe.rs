use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::StackConfig;
use super::StackError;

/// Fixed-interval HTTP readiness check with a bounded number of attempts.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    http: reqwest::Client,
    attempts: u32,
    interval: Duration,
    show_progress: bool,
}

impl ReadinessProbe {
    pub fn new(attempts: u32, interval: Duration) -> Result<Self, StackError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            attempts: attempts.max(1),
            interval,
            show_progress: true,
        })
    }

    pub fn from_config(config: &StackConfig) -> Result<Self, StackError> {
        Self::new(config.ready_attempts, Duration::from_secs(config.ready_interval_secs))
    }

    /// Disables the terminal spinner.
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// One GET; any 2xx counts as ready.
    pub async fn check(&self, url: &str) -> bool {
        match self.http.get(url).send().await {
            Ok(response) => {
                debug!("Probe {} -> {}", url, response.status());
                response.status().is_success()
            }
            Err(e) => {
                debug!("Probe {} failed: {}", url, e);
                false
            }
        }
    }

    /// Polls `url` until it answers or the attempts run out.
    ///
    /// Returns the attempt number that succeeded.
    pub async fn wait_until_ready(&self, name: &str, url: &str) -> Result<u32, StackError> {
        let pb = if self.show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} {wide_msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        } else {
            ProgressBar::hidden()
        };

        info!("Waiting for {} at {} ({} attempts)", name, url, self.attempts);
        for attempt in 1..=self.attempts {
            pb.set_message(format!("Waiting for {}... ({}/{})", name, attempt, self.attempts));

            if self.check(url).await {
                pb.finish_with_message(format!("{} is ready", name));
                info!("{} ready after {} attempt(s)", name, attempt);
                return Ok(attempt);
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        pb.finish_with_message(format!("{} did not become ready", name));
        warn!("{} at {} not ready after {} attempts", name, url, self.attempts);
        Err(StackError::NotReady {
            url: url.to_string(),
            attempts: self.attempts,
        })
    }
}
