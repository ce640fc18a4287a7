use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::pet::FoodCategory;

/// Connection settings for the food classifier service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Result of classifying one food photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: FoodCategory,
    pub confidence: f64,
    #[serde(default)]
    pub all_probabilities: HashMap<String, f64>,
}

/// HTTP client for the external image classifier.
///
/// Classification is fail-closed: any transport or decode failure is
/// surfaced as an `Upstream` error and no pet mutation happens.
pub struct FoodClassifier {
    client: Client,
    config: ClassifierConfig,
}

impl FoodClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Upstream(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub async fn classify(&self, image: Vec<u8>, filename: &str) -> Result<Classification> {
        let url = format!("{}/predict", self.config.base_url.trim_end_matches('/'));

        let part = reqwest::multipart::Part::bytes(image)
            .file_name(filename.to_string())
            .mime_str("image/jpeg")
            .map_err(|e| AppError::Upstream(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Classifier returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        parse_classification(&body)
    }
}

pub fn parse_classification(body: &str) -> Result<Classification> {
    serde_json::from_str(body)
        .map_err(|e| AppError::Upstream(format!("Invalid classifier response: {}", e)))
}
