use std::pin::Pin;
use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::config::OllamaConfig;
use super::stream::NdjsonDecoder;
use super::types::{GenerateRequest, GenerateResponse, ModelInfo, OllamaError, TagsResponse};

/// Stream of generate responses, one per NDJSON line.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<GenerateResponse, OllamaError>> + Send>>;

/// Thin async client for the parts of the Ollama API this tool consumes.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    connect_timeout: Duration,
}

impl OllamaClient {
    /// Client with the stock timeouts (120 s generation, 5 s connection check).
    pub fn new(base_url: impl Into<String>) -> Result<Self, OllamaError> {
        Self::with_timeouts(base_url, Duration::from_secs(120), Duration::from_secs(5))
    }

    pub fn from_config(config: &OllamaConfig) -> Result<Self, OllamaError> {
        Self::with_timeouts(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, OllamaError> {
        // The read timeout bounds every chunk of a streamed answer as well
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(timeout)
            .build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            connect_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> OllamaError {
        if e.is_connect() {
            OllamaError::ServerNotRunning(self.base_url.clone())
        } else if e.is_timeout() {
            OllamaError::Timeout(self.base_url.clone())
        } else {
            OllamaError::Http(e)
        }
    }

    async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, OllamaError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(OllamaError::Api { status, body })
    }

    /// True when `GET /api/tags` answers 200 within the connect timeout.
    pub async fn check_connection(&self) -> bool {
        match self
            .http
            .get(self.url("/api/tags"))
            .timeout(self.connect_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Connection check against {} failed: {}", self.base_url, e);
                false
            }
        }
    }

    /// Lists the models the server has registered.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, OllamaError> {
        let response = self
            .http
            .get(self.url("/api/tags"))
            .timeout(self.connect_timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = Self::error_for_status(response).await?;

        let tags: TagsResponse = serde_json::from_str(&response.text().await?)?;
        debug!("Ollama lists {} model(s)", tags.models.len());
        Ok(tags.models)
    }

    /// Sends a prompt and waits for the full answer.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, OllamaError> {
        let mut request = request.clone();
        request.stream = false;

        info!("Generating with model {}", request.model);
        let response = self
            .http
            .post(self.url("/api/generate"))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = Self::error_for_status(response).await?;

        let body: GenerateResponse = serde_json::from_str(&response.text().await?)?;
        if let Some(error) = body.error {
            return Err(OllamaError::Model(error));
        }
        Ok(body)
    }

    /// Sends a prompt and yields the answer as it is produced.
    ///
    /// The stream ends after the chunk flagged `done`, or when the server
    /// closes the connection.
    pub async fn generate_stream(&self, request: &GenerateRequest) -> Result<ResponseStream, OllamaError> {
        let mut request = request.clone();
        request.stream = true;

        info!("Streaming generation with model {}", request.model);
        let response = self
            .http
            .post(self.url("/api/generate"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = Self::error_for_status(response).await?;

        let base_url = self.base_url.clone();
        let mut bytes = response.bytes_stream();
        let chunks = stream! {
            let mut decoder = NdjsonDecoder::new();
            'read: while let Some(item) = bytes.next().await {
                match item {
                    Ok(data) => {
                        for chunk in decoder.push(&data) {
                            if let Some(error) = chunk.error {
                                yield Err(OllamaError::Model(error));
                                break 'read;
                            }
                            let done = chunk.done;
                            yield Ok(chunk);
                            if done {
                                break 'read;
                            }
                        }
                    }
                    Err(e) if e.is_timeout() => {
                        warn!("Generation stream from {} stalled", base_url);
                        yield Err(OllamaError::Timeout(base_url.clone()));
                        break 'read;
                    }
                    Err(e) => {
                        warn!("Error reading generation stream: {}", e);
                        yield Err(OllamaError::Http(e));
                        break 'read;
                    }
                }
            }
            if let Some(chunk) = decoder.finish() {
                match chunk.error {
                    Some(error) => yield Err(OllamaError::Model(error)),
                    None => yield Ok(chunk),
                }
            }
        };

        Ok(Box::pin(chunks))
    }
}
