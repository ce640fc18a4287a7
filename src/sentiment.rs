use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::pet::{MOOD_IMPACT_MAX, MOOD_IMPACT_MIN};

const SYSTEM_PROMPT: &str = "You are an emotion analyzer for a virtual pet cat. \
Analyze the given speech and determine its emotional impact. \
Return a JSON response with exactly these fields: \
- moodImpact: number between -10 and 10 (positive for kind/loving speech, negative for harsh/mean speech) \
- sentiment: either \"positive\", \"negative\", or \"neutral\" \
- reaction: a brief, realistic description of how a cat would react to this interaction";

const FALLBACK_REACTION: &str = "The cat seems unsure how to react.";

/// Connection settings for the sentiment (LLM) service.
/// Any OpenAI-compatible chat completions endpoint works.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Scored emotional impact of one interaction.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionAnalysis {
    pub mood_impact: i32,
    pub sentiment: Sentiment,
    pub reaction: String,
}

impl InteractionAnalysis {
    /// The neutral result every failure degrades to.
    pub fn fallback() -> Self {
        InteractionAnalysis {
            mood_impact: 0,
            sentiment: Sentiment::Neutral,
            reaction: FALLBACK_REACTION.to_string(),
        }
    }
}

/// Client for the external sentiment service.
///
/// Analysis is fail-open: a transport failure, a bad model response or a
/// missing API key all degrade to the neutral fallback instead of
/// surfacing an error. The caller never sees an upstream failure.
pub struct SentimentAnalyzer {
    client: Client,
    config: SentimentConfig,
}

impl SentimentAnalyzer {
    pub fn new(config: SentimentConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    pub async fn analyze(&self, speech: &str) -> InteractionAnalysis {
        match self.try_analyze(speech).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Sentiment analysis failed, degrading to neutral: {}", e);
                InteractionAnalysis::fallback()
            }
        }
    }

    async fn try_analyze(&self, speech: &str) -> anyhow::Result<InteractionAnalysis> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": speech},
            ],
            "stream": false,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Sentiment service returned HTTP {}", response.status());
        }

        let value: serde_json::Value = response.json().await?;
        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("No response content from LLM"))?;

        parse_analysis(content)
    }
}

/// Parse and validate the model's JSON reply.
pub fn parse_analysis(content: &str) -> anyhow::Result<InteractionAnalysis> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawAnalysis {
        mood_impact: i32,
        sentiment: Sentiment,
        reaction: String,
    }

    let raw: RawAnalysis = serde_json::from_str(content)?;

    Ok(InteractionAnalysis {
        mood_impact: raw.mood_impact.clamp(MOOD_IMPACT_MIN, MOOD_IMPACT_MAX),
        sentiment: raw.sentiment,
        reaction: raw.reaction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analysis() {
        let content = r#"{"moodImpact": 7, "sentiment": "positive", "reaction": "Purrs loudly."}"#;
        let analysis = parse_analysis(content).unwrap();
        assert_eq!(analysis.mood_impact, 7);
        assert_eq!(analysis.sentiment, Sentiment::Positive);
        assert_eq!(analysis.reaction, "Purrs loudly.");
    }

    #[test]
    fn test_out_of_range_impact_clamped() {
        let content = r#"{"moodImpact": 42, "sentiment": "positive", "reaction": "!"}"#;
        assert_eq!(parse_analysis(content).unwrap().mood_impact, 10);

        let content = r#"{"moodImpact": -42, "sentiment": "negative", "reaction": "!"}"#;
        assert_eq!(parse_analysis(content).unwrap().mood_impact, -10);
    }

    #[test]
    fn test_invalid_sentiment_rejected() {
        let content = r#"{"moodImpact": 1, "sentiment": "confused", "reaction": "?"}"#;
        assert!(parse_analysis(content).is_err());
    }

    #[test]
    fn test_fallback_is_neutral() {
        let fallback = InteractionAnalysis::fallback();
        assert_eq!(fallback.mood_impact, 0);
        assert_eq!(fallback.sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_open() {
        let analyzer = SentimentAnalyzer::new(SentimentConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            model: "test".to_string(),
            api_key: None,
            timeout_secs: 1,
        });

        // No error surfaces; the analysis degrades to neutral.
        let analysis = analyzer.analyze("good kitty").await;
        assert_eq!(analysis.mood_impact, 0);
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
    }
}
