use serde::Serialize;

use copilot_core::domain::alert::AlertPriority;
use copilot_core::recommendation::{screen_recommendation, RecommendationOutcome};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct Classification {
    outcome: &'static str,
    priority: Option<AlertPriority>,
}

/// Screens recommendation text the way a session would before alerting.
pub fn run(text: &str) -> CommandResult {
    let classification = match screen_recommendation(text) {
        RecommendationOutcome::Ready { priority, .. } => {
            Classification { outcome: "ready", priority: Some(priority) }
        }
        RecommendationOutcome::Waiting { .. } => {
            Classification { outcome: "waiting", priority: None }
        }
        RecommendationOutcome::Failed { .. } => {
            Classification { outcome: "failed", priority: None }
        }
    };

    let message = match classification.priority {
        Some(priority) => format!("alert priority {}", priority.as_str()),
        None => format!("not an alert ({})", classification.outcome),
    };
    CommandResult::success_with_data("classify", message, &classification)
}
