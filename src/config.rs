use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierConfig;
use crate::sentiment::SentimentConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub port: u16,
    pub decay_interval_secs: u64,
    pub notify_min_interval_ms: u64,
    pub token_secret: String,
    pub classifier: ClassifierConfig,
    pub sentiment: SentimentConfig,
}

impl Config {
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("syui")
                .join("ai")
                .join("pet")
        });

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        let config_path = data_dir.join("config.json");

        let mut config = if config_path.exists() {
            let config_str =
                std::fs::read_to_string(&config_path).context("Failed to read config.json")?;
            let mut config: Config =
                serde_json::from_str(&config_str).context("Failed to parse config.json")?;
            config.data_dir = data_dir;
            config
        } else {
            let config = Self::default_config(data_dir);
            let json_str = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config")?;
            std::fs::write(&config_path, json_str).context("Failed to write default config.json")?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment wins over the config file for secrets and endpoints.
    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("AIPET_TOKEN_SECRET") {
            self.token_secret = secret;
        }
        if let Ok(port) = std::env::var("AIPET_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(url) = std::env::var("AIPET_CLASSIFIER_URL") {
            self.classifier.base_url = url;
        }
        if self.sentiment.api_key.as_ref().map_or(true, |k| k.is_empty()) {
            self.sentiment.api_key = std::env::var("DEEPSEEK_API_KEY").ok();
        }
    }

    fn default_config(data_dir: PathBuf) -> Self {
        Config {
            data_dir,
            port: 4000,
            decay_interval_secs: 60,
            notify_min_interval_ms: 1000,
            token_secret: "this is a secret key".to_string(),
            classifier: ClassifierConfig::default(),
            sentiment: SentimentConfig::default(),
        }
    }

    pub fn db_file(&self) -> PathBuf {
        self.data_dir.join("pet.db")
    }
}
