use serde::{Deserialize, Serialize};

use crate::alerts::classify;
use crate::domain::alert::AlertPriority;

pub const WAITING_SENTINEL: &str = "***Waiting for More Client Information***";
pub const ERROR_MARKER: &str = "Error";
pub const DEFAULT_PLACEHOLDER_TEXT: &str = "Your conversation transcript will appear here...";

/// What the caller should do with a raw recommendation answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecommendationOutcome {
    Ready { content: String, priority: AlertPriority },
    Waiting { content: String },
    Failed { content: String },
}

/// Only `Ready` answers may reach the alert manager.
pub fn screen_recommendation(raw: &str) -> RecommendationOutcome {
    let content = raw.trim().to_string();
    if content.contains(WAITING_SENTINEL) {
        RecommendationOutcome::Waiting { content }
    } else if content.contains(ERROR_MARKER) {
        RecommendationOutcome::Failed { content }
    } else {
        let priority = classify(&content);
        RecommendationOutcome::Ready { content, priority }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    pub reason_code: &'static str,
    pub user_message: String,
}

/// Gatekeeps the provider call: empty, placeholder, or too-short transcripts are rejected.
pub fn validate_transcript(
    transcript: &str,
    placeholder_text: &str,
    min_chars: usize,
) -> Result<(), ValidationFailure> {
    let trimmed = transcript.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure {
            reason_code: "empty_transcript",
            user_message: "Start the conversation before requesting a recommendation.".to_string(),
        });
    }
    if trimmed == placeholder_text.trim() {
        return Err(ValidationFailure {
            reason_code: "placeholder_transcript",
            user_message: "No client conversation has been captured yet. Start speaking to build a transcript."
                .to_string(),
        });
    }
    if trimmed.chars().count() < min_chars {
        return Err(ValidationFailure {
            reason_code: "transcript_too_short",
            user_message: "The conversation is too short for a recommendation. Keep talking with the client and try again."
                .to_string(),
        });
    }
    Ok(())
}

/// The recommendation slot shown to the advisor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum RecommendationState {
    #[default]
    Idle,
    Generating,
    Waiting(String),
    Ready(String),
    Failed(String),
    Skipped(String),
}

impl RecommendationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Waiting(_) => "waiting",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
            Self::Skipped(_) => "skipped",
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Idle | Self::Generating => None,
            Self::Waiting(text)
            | Self::Ready(text)
            | Self::Failed(text)
            | Self::Skipped(text) => Some(text),
        }
    }
}

impl From<&RecommendationOutcome> for RecommendationState {
    fn from(outcome: &RecommendationOutcome) -> Self {
        match outcome {
            RecommendationOutcome::Ready { content, .. } => Self::Ready(content.clone()),
            RecommendationOutcome::Waiting { content } => Self::Waiting(content.clone()),
            RecommendationOutcome::Failed { content } => Self::Failed(content.clone()),
        }
    }
}
