use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::translation::DEFAULT_BATCH_SIZE;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Translation provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Number of segments translated per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Directory holding uploads, results and the task snapshot
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Worker poll interval in seconds (wakeups also happen on submission)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Settings for the Ollama translation provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Ollama endpoint URL
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    /// Model name to use for translation
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            model: default_ollama_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults
    /// when the file does not exist
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.provider.endpoint.is_empty() {
            return Err(anyhow::anyhow!("Provider endpoint cannot be empty"));
        }
        if self.provider.model.is_empty() {
            return Err(anyhow::anyhow!("Provider model cannot be empty"));
        }
        if self.batch_size == 0 {
            return Err(anyhow::anyhow!("Batch size must be at least 1"));
        }
        Ok(())
    }

    /// Directory where submitted files are stored
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Directory where result artifacts are written
    pub fn results_dir(&self) -> PathBuf {
        self.data_dir.join("results")
    }

    /// Location of the durable task snapshot
    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            provider: ProviderConfig::default(),
            batch_size: default_batch_size(),
            data_dir: default_data_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            log_level: LogLevel::default(),
        }
    }
}
