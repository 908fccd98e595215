// Required external crates for configuration management and serialization
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use config::{Config, ConfigError, Environment, File};

mod preferences;

pub use preferences::UserPreferences;

/// Default Ollama endpoint when nothing else is configured
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Model registered by the import loop from the bundled GGUF file
pub const DEFAULT_MODEL: &str = "llama3-small-q3-k-s";

/// Configuration for reaching the inference server
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OllamaConfig {
    /// Base URL of the Ollama HTTP API
    pub url: String,
    /// Timeout for generation requests, in seconds
    pub timeout_secs: u64,
    /// Timeout for connection checks, in seconds
    pub connect_timeout_secs: u64,
}

/// Defaults applied to every chat/completion request
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    /// Model used when `--model` is not given
    pub default_model: String,
    /// Whether responses are streamed by default
    pub stream: bool,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// Configuration for the Docker Compose stack
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StackConfig {
    /// Directory the compose commands run in
    pub project_dir: PathBuf,
    /// Compose file, relative to `project_dir` unless absolute
    pub compose_file: PathBuf,
    /// Directory scanned by `import-models`
    pub models_dir: PathBuf,
    /// Web chat UI address probed for health
    pub webui_url: String,
    /// Number of readiness probes before giving up
    pub ready_attempts: u32,
    /// Pause between readiness probes, in seconds
    pub ready_interval_secs: u64,
    /// Lines shown by `logs` when `--tail` is not given
    pub log_tail: u32,
    /// Ollama executable used inside the container
    pub ollama_binary: String,
}

/// Configuration for application logging
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Directory for the rolling log files
    pub directory: PathBuf,
}

/// Main settings struct that contains all configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub ollama: OllamaConfig,
    pub chat: ChatConfig,
    pub stack: StackConfig,
    pub logging: LoggingConfig,
}

/// Environment source: `LLAMABOX_CHAT__DEFAULT_MODEL` maps to `chat.default_model`.
pub fn environment() -> Environment {
    Environment::with_prefix("LLAMABOX")
        .prefix_separator("_")
        .separator("__")
}

/// Root directory for per-user state (`~/.llamabox`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".llamabox")
}

impl Settings {
    /// Creates a new Settings instance by loading config from multiple sources
    /// in the following order of precedence (highest to lowest):
    /// 1. Environment variables prefixed with LLAMABOX_ (`__` separates sections)
    /// 2. User preferences JSON (`~/.llamabox/config.json` unless overridden)
    /// 3. Local config file (config/local.toml) if present
    /// 4. Default config file (config/default.toml) if present
    /// 5. Built-in defaults
    pub fn new(preferences_path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_dir = std::env::current_dir()
            .map_err(|e| ConfigError::Message(
                format!("Failed to get current directory: {}", e)
            ))?
            .join("config");

        let preferences_path = preferences_path
            .map(Path::to_path_buf)
            .unwrap_or_else(UserPreferences::default_path);
        let preferences = UserPreferences::load(&preferences_path)?;

        Self::load(&config_dir, preferences, environment())
    }

    /// Builds settings from an explicit config directory, preferences and environment source.
    pub fn load(
        config_dir: &Path,
        preferences: UserPreferences,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let default_config = config_dir.join("default.toml");
        let local_config = config_dir.join("local.toml");

        let settings = Self::with_defaults(Config::builder())?
            .add_source(File::from(default_config).required(false))
            .add_source(File::from(local_config).required(false))
            .add_source(preferences)
            .add_source(environment)
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;

        Ok(settings)
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let log_dir = dirs::data_local_dir()
            .map(|d| d.join("llamabox").join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"));

        builder
            .set_default("ollama.url", DEFAULT_OLLAMA_URL)?
            .set_default("ollama.timeout_secs", 120_i64)?
            .set_default("ollama.connect_timeout_secs", 5_i64)?
            .set_default("chat.default_model", DEFAULT_MODEL)?
            .set_default("chat.stream", false)?
            .set_default("chat.max_tokens", 2048_i64)?
            .set_default("chat.temperature", 0.7)?
            .set_default("stack.project_dir", ".")?
            .set_default("stack.compose_file", "docker-compose.yml")?
            .set_default("stack.models_dir", "/models")?
            .set_default("stack.webui_url", "http://localhost:3000")?
            .set_default("stack.ready_attempts", 30_i64)?
            .set_default("stack.ready_interval_secs", 2_i64)?
            .set_default("stack.log_tail", 100_i64)?
            .set_default("stack.ollama_binary", "ollama")?
            .set_default("logging.level", "info")?
            .set_default("logging.directory", log_dir.to_string_lossy().to_string())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ConfigError::Message(
                format!("Temperature must be between 0.0 and 2.0, got: {}", self.chat.temperature)
            ));
        }

        if self.chat.max_tokens == 0 {
            return Err(ConfigError::Message(
                "max_tokens must be greater than 0".to_string()
            ));
        }

        if self.chat.default_model.trim().is_empty() {
            return Err(ConfigError::Message(
                "default_model must not be empty".to_string()
            ));
        }

        for (key, url) in [("ollama.url", &self.ollama.url), ("stack.webui_url", &self.stack.webui_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Message(
                    format!("{} must be an http(s) URL, got: {}", key, url)
                ));
            }
        }

        if self.stack.ready_attempts == 0 {
            return Err(ConfigError::Message(
                "ready_attempts must be greater than 0".to_string()
            ));
        }

        if self.stack.ready_interval_secs == 0 {
            return Err(ConfigError::Message(
                "ready_interval_secs must be greater than 0".to_string()
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::Message(
                format!("Invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                    self.logging.level)
            )),
        }
    }

    /// Compose file resolved against the project directory.
    pub fn compose_file(&self) -> PathBuf {
        if self.stack.compose_file.is_absolute() {
            self.stack.compose_file.clone()
        } else {
            self.stack.project_dir.join(&self.stack.compose_file)
        }
    }

    /// Ollama base URL without a trailing slash.
    pub fn ollama_url(&self) -> &str {
        self.ollama.url.trim_end_matches('/')
    }
}
