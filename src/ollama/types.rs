use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from talking to the Ollama HTTP API.
#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Ollama is not running or not accessible at {0}")]
    ServerNotRunning(String),
    #[error("Request to {0} timed out")]
    Timeout(String),
    #[error("Ollama API error: {status} - {body}")]
    Api { status: u16, body: String },
    #[error("Model error: {0}")]
    Model(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sampling options forwarded to the model.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
    /// Context returned by a previous response, continues that conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            stream: false,
            context: None,
            options: None,
        }
    }

    pub fn with_system(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }

    pub fn with_context(mut self, context: Option<Vec<i64>>) -> Self {
        self.context = context;
        self
    }

    pub fn with_options(mut self, temperature: f32, num_predict: u32) -> Self {
        self.options = Some(GenerateOptions { temperature, num_predict });
        self
    }
}

/// A generate response. In streaming mode every NDJSON line has this shape,
/// with `done` set on the final one.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GenerateResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub context: Option<Vec<i64>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A model as reported by `GET /api/tags`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub digest: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_unset_fields() {
        let request = GenerateRequest::new("llama3", "hi");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "llama3");
        assert_eq!(json["stream"], false);
        assert!(json.get("system").is_none());
        assert!(json.get("context").is_none());
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_request_with_options() {
        let request = GenerateRequest::new("llama3", "hi")
            .with_system(Some("be brief".to_string()))
            .with_options(0.2, 128);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["system"], "be brief");
        assert_eq!(json["options"]["num_predict"], 128);
    }

    #[test]
    fn test_tags_tolerates_missing_fields() {
        let tags: TagsResponse = serde_json::from_str(r#"{"models":[{"name":"a"}]}"#).unwrap();
        assert_eq!(tags.models[0].size, 0);
        assert_eq!(tags.models[0].modified_at, "");
    }
}
