use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Mixed => "mixed",
        }
    }
}

/// Provider confidences in `[0, 1]`. They need not sum to exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl Confidence {
    pub const NEUTRAL_DEFAULT: Self = Self { positive: 0.33, negative: 0.33, neutral: 0.34 };

    pub fn new(positive: f64, negative: f64, neutral: f64) -> Self {
        Self { positive, negative, neutral }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    pub confidence: Confidence,
}

impl SentimentScore {
    pub fn new(label: SentimentLabel, confidence: Confidence) -> Self {
        Self { label, confidence }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredSentence {
    pub text: String,
    pub score: SentimentScore,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateSentiment {
    pub label: SentimentLabel,
    pub score: f64,
    pub confidence: Confidence,
}

impl Default for AggregateSentiment {
    fn default() -> Self {
        Self { label: SentimentLabel::Neutral, score: 0.5, confidence: Confidence::NEUTRAL_DEFAULT }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingSentiment {
    pub overall: AggregateSentiment,
    pub all_sentences: Vec<ScoredSentence>,
}

/// Sentiment of the most recent utterance together with the sentence it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentSentiment {
    pub score: SentimentScore,
    pub sentence: String,
}
