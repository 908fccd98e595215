use std::fs;
use std::path::{Path, PathBuf};

use config::{ConfigError, Map, Source, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL};

/// Per-user preferences stored as a small JSON file.
///
/// Every key is optional; absent keys fall through to the lower precedence
/// configuration sources.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl UserPreferences {
    /// `~/.llamabox/config.json`
    pub fn default_path() -> PathBuf {
        super::home_dir().join("config.json")
    }

    /// Preferences with every key filled in, written by `config init`.
    pub fn template() -> Self {
        Self {
            default_model: Some(DEFAULT_MODEL.to_string()),
            ollama_url: Some(DEFAULT_OLLAMA_URL.to_string()),
            stream: Some(false),
            max_tokens: Some(2048),
            temperature: Some(0.7),
        }
    }

    /// Reads the preferences file. A missing file yields empty preferences.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No preferences file at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Message(
            format!("Failed to read preferences file {}: {}", path.display(), e)
        ))?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Message(
            format!("Malformed preferences file {}: {}", path.display(), e)
        ))
    }

    /// Writes the preferences as pretty JSON, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Message(
                format!("Failed to create directory {}: {}", parent.display(), e)
            ))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        fs::write(path, content).map_err(|e| ConfigError::Message(
            format!("Failed to write preferences file {}: {}", path.display(), e)
        ))?;

        info!("Preferences written to {}", path.display());
        Ok(())
    }
}

impl Source for UserPreferences {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        let origin = "user preferences".to_string();
        let mut map = Map::new();

        if let Some(model) = &self.default_model {
            map.insert("chat.default_model".to_string(), Value::new(Some(&origin), model.clone()));
        }
        if let Some(url) = &self.ollama_url {
            map.insert("ollama.url".to_string(), Value::new(Some(&origin), url.clone()));
        }
        if let Some(stream) = self.stream {
            map.insert("chat.stream".to_string(), Value::new(Some(&origin), stream));
        }
        if let Some(max_tokens) = self.max_tokens {
            map.insert("chat.max_tokens".to_string(), Value::new(Some(&origin), max_tokens as i64));
        }
        if let Some(temperature) = self.temperature {
            map.insert("chat.temperature".to_string(), Value::new(Some(&origin), temperature as f64));
        }

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = UserPreferences::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(prefs, UserPreferences::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        UserPreferences::template().save(&path).unwrap();
        let loaded = UserPreferences::load(&path).unwrap();

        assert_eq!(loaded.default_model.as_deref(), Some(DEFAULT_MODEL));
        assert_eq!(loaded.stream, Some(false));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"default_model": "x", "colour": "blue"}"#).unwrap();

        let err = UserPreferences::load(&path).unwrap_err();
        assert!(err.to_string().contains("Malformed preferences file"));
    }

    #[test]
    fn test_collect_maps_flat_keys_to_sections() {
        let prefs = UserPreferences {
            default_model: Some("mistral".to_string()),
            max_tokens: Some(256),
            ..Default::default()
        };
        let map = prefs.collect().unwrap();

        assert_eq!(map.len(), 2);
        assert!(map.contains_key("chat.default_model"));
        assert!(map.contains_key("chat.max_tokens"));
    }
}
