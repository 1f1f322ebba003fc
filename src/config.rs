use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Display name the bot answers to; also drives the persona preamble.
    bot_name: String,
    /// Credit line stamped on generated stickers.
    #[serde(default)]
    author: String,
    #[serde(default = "default_prefix")]
    command_prefix: String,
    /// Route unmatched messages to the conversational handler.
    #[serde(default = "default_true")]
    conversational: bool,
    /// Participate in group chats.
    #[serde(default)]
    groups: bool,
    api_key: String,
    #[serde(default = "default_api_base")]
    api_base: String,
    #[serde(default = "default_primary_model")]
    primary_model: String,
    #[serde(default = "default_fallback_models")]
    fallback_models: Vec<String>,
    #[serde(default = "default_transcription_model")]
    transcription_model: String,
    /// How many recent messages go into the conversation window.
    #[serde(default = "default_history_limit")]
    history_limit: usize,
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_true() -> bool {
    true
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_primary_model() -> String {
    "gpt-4".to_string()
}

fn default_fallback_models() -> Vec<String> {
    vec!["gpt-3.5-turbo-16k".to_string(), "gpt-3.5-turbo".to_string()]
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_history_limit() -> usize {
    15
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub author: String,
    pub command_prefix: String,
    pub conversational: bool,
    pub groups: bool,
    pub api_key: String,
    pub api_base: String,
    pub primary_model: String,
    pub fallback_models: Vec<String>,
    pub transcription_model: String,
    pub history_limit: usize,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.bot_name.trim().is_empty() {
            return Err(ConfigError::Validation("bot_name must not be empty".into()));
        }
        if file.api_key.is_empty() {
            return Err(ConfigError::Validation("api_key is required".into()));
        }
        if file.command_prefix.is_empty() {
            return Err(ConfigError::Validation("command_prefix must not be empty".into()));
        }
        if file.fallback_models.is_empty() {
            return Err(ConfigError::Validation(
                "fallback_models must contain at least one model".into(),
            ));
        }
        if file.history_limit == 0 {
            return Err(ConfigError::Validation("history_limit must be at least 1".into()));
        }

        Ok(Self {
            bot_name: file.bot_name,
            author: file.author,
            command_prefix: file.command_prefix,
            conversational: file.conversational,
            groups: file.groups,
            api_key: file.api_key,
            api_base: file.api_base,
            primary_model: file.primary_model,
            fallback_models: file.fallback_models,
            transcription_model: file.transcription_model,
            history_limit: file.history_limit,
        })
    }
}
