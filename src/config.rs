use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_chat_url")]
    pub chat_url: String,

    #[serde(default = "default_stt_url")]
    pub stt_url: String,

    #[serde(default = "default_stt_api_key")]
    pub stt_api_key: String,

    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub whisper_prompt: Option<String>,
}

fn default_chat_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_stt_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_stt_api_key() -> String {
    "dummy".to_string()
}

fn default_stt_model() -> String {
    "Systran/faster-whisper-base".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat_url: default_chat_url(),
            stt_url: default_stt_url(),
            stt_api_key: default_stt_api_key(),
            stt_model: default_stt_model(),
            language: None,
            whisper_prompt: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/voxchat/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("voxchat").join("config.json"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.chat_url.is_empty() {
            return Err(anyhow::anyhow!("chat_url cannot be empty"));
        }

        if self.stt_url.is_empty() {
            return Err(anyhow::anyhow!("stt_url cannot be empty"));
        }

        if self.stt_model.is_empty() {
            return Err(anyhow::anyhow!("stt_model cannot be empty"));
        }

        Ok(())
    }
}
