use chrono::{DateTime, Utc};

use crate::domain::sentiment::{
    AggregateSentiment, Confidence, RollingSentiment, ScoredSentence, SentimentLabel,
    SentimentScore,
};

/// Positive/negative means closer than this are reported as `Mixed`.
pub const MIXED_MARGIN: f64 = 0.1;

/// Owner of the append-only sentence list and its aggregate.
#[derive(Clone, Debug, Default)]
pub struct SentimentAggregator {
    rolling: RollingSentiment,
}

impl SentimentAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_sentence(
        &mut self,
        text: impl Into<String>,
        score: SentimentScore,
        timestamp: DateTime<Utc>,
    ) -> RollingSentiment {
        self.rolling.all_sentences.push(ScoredSentence { text: text.into(), score, timestamp });
        self.rolling.overall = aggregate(&self.rolling.all_sentences);
        self.rolling.clone()
    }

    pub fn snapshot(&self) -> RollingSentiment {
        self.rolling.clone()
    }

    pub fn overall(&self) -> AggregateSentiment {
        self.rolling.overall
    }

    pub fn len(&self) -> usize {
        self.rolling.all_sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rolling.all_sentences.is_empty()
    }
}

/// Folds every sentence into one aggregate using mean confidences.
///
/// The tie-break is intentionally asymmetric: `Mixed` only resolves near-ties
/// between positive and negative, never ties involving neutral.
pub fn aggregate(sentences: &[ScoredSentence]) -> AggregateSentiment {
    if sentences.is_empty() {
        return AggregateSentiment::default();
    }

    let count = sentences.len() as f64;
    let (positive, negative, neutral) =
        sentences.iter().fold((0.0, 0.0, 0.0), |(pos, neg, neu), sentence| {
            let confidence = sentence.score.confidence;
            (pos + confidence.positive, neg + confidence.negative, neu + confidence.neutral)
        });
    let mean = Confidence::new(positive / count, negative / count, neutral / count);

    let (label, score) = if mean.positive > mean.negative && mean.positive > mean.neutral {
        (SentimentLabel::Positive, mean.positive)
    } else if mean.negative > mean.positive && mean.negative > mean.neutral {
        (SentimentLabel::Negative, mean.negative)
    } else if (mean.positive - mean.negative).abs() < MIXED_MARGIN {
        (SentimentLabel::Mixed, (mean.positive + mean.negative) / 2.0)
    } else {
        (SentimentLabel::Neutral, mean.neutral)
    };

    AggregateSentiment { label, score, confidence: mean }
}
