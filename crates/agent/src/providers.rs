use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use copilot_core::domain::sentiment::SentimentScore;

pub const NO_KEY_PHRASES: &str = "NoKP";
pub const NO_ENTITIES: &str = "NoEnt";
pub const NO_PII: &str = "NoPII";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentenceSentiment {
    pub text: String,
    pub score: SentimentScore,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentDetail {
    pub overall: SentimentScore,
    pub sentences: Vec<SentenceSentiment>,
}

/// Result of enriching a single utterance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub key_phrases: String,
    pub entities: String,
    pub pii_redacted: String,
    pub sentiment: Option<SentimentDetail>,
}

impl Enrichment {
    /// Sentinel substituted when the enrichment provider fails or times out.
    pub fn unavailable() -> Self {
        Self {
            key_phrases: NO_KEY_PHRASES.to_string(),
            entities: NO_ENTITIES.to_string(),
            pii_redacted: NO_PII.to_string(),
            sentiment: None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.key_phrases == NO_KEY_PHRASES
            && self.entities == NO_ENTITIES
            && self.pii_redacted == NO_PII
            && self.sentiment.is_none()
    }
}

#[async_trait]
pub trait NlpEnricher: Send + Sync {
    async fn enrich(&self, utterance: &str) -> Result<Enrichment>;
}

#[async_trait]
pub trait GuidanceGenerator: Send + Sync {
    async fn generate_guidance(&self, transcript: &str, question_template: &str)
        -> Result<String>;
}

#[async_trait]
pub trait RecommendationGenerator: Send + Sync {
    async fn generate_recommendation(&self, transcript: &str) -> Result<String>;
}
