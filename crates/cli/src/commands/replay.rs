use std::path::Path;
use std::sync::Arc;

use copilot_agent::lexicon::LexiconEnricher;
use copilot_agent::llm::{LlmGuidanceGenerator, LlmRecommendationGenerator, StaticLlmClient};
use copilot_agent::session::{
    Collaborators, ConversationSession, RecommendationAttempt, SessionSettings, SessionSnapshot,
};
use copilot_core::config::{AppConfig, LoadOptions};
use copilot_core::domain::utterance::SessionId;
use copilot_core::recommendation::{RecommendationState, WAITING_SENTINEL};
use serde::Serialize;

use crate::commands::{read_input, CommandResult};

#[derive(Clone, Debug, Default)]
pub struct ReplayOptions<'a> {
    pub transcript: Option<&'a Path>,
    pub guidance_response: Option<&'a Path>,
    pub recommendation_response: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    utterances: usize,
    final_recommendation: Option<String>,
    snapshot: SessionSnapshot,
}

/// Feeds a transcript through a session line by line using offline collaborators, then stops it.
pub fn run(options: ReplayOptions<'_>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("replay", "config_validation", error.to_string(), 2)
        }
    };
    let settings = match SessionSettings::from_config(&config) {
        Ok(settings) => settings,
        Err(error) => {
            return CommandResult::failure("replay", "config_validation", error.to_string(), 2)
        }
    };

    let transcript = match read_input(options.transcript) {
        Ok(transcript) => transcript,
        Err(error) => return CommandResult::failure("replay", "input", format!("{error:#}"), 3),
    };
    let guidance_response = match options.guidance_response {
        Some(path) => match read_input(Some(path)) {
            Ok(response) => response,
            Err(error) => {
                return CommandResult::failure("replay", "input", format!("{error:#}"), 3)
            }
        },
        None => all_questions_unaddressed(&config),
    };
    let recommendation_response =
        options.recommendation_response.unwrap_or_else(|| WAITING_SENTINEL.to_string());

    let collaborators = Collaborators {
        enricher: Arc::new(LexiconEnricher::new()),
        guidance: Arc::new(LlmGuidanceGenerator::new(StaticLlmClient::new(guidance_response))),
        recommendation: Arc::new(LlmRecommendationGenerator::new(StaticLlmClient::new(
            recommendation_response,
        ))),
    };
    let session = ConversationSession::new(SessionId::generate(), settings, collaborators);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure("replay", "runtime", error.to_string(), 4),
    };

    let report = runtime.block_on(async {
        let mut utterances = 0;
        for line in transcript.lines().filter(|line| !line.trim().is_empty()) {
            session.on_utterance_recognized(line).await;
            utterances += 1;
        }

        let final_recommendation = session.stop().await.map(describe_attempt);
        ReplayReport { utterances, final_recommendation, snapshot: session.snapshot().await }
    });

    let message = format!(
        "replayed {} utterances; {} alerts recorded",
        report.utterances,
        report.snapshot.alerts.len()
    );
    CommandResult::success_with_data("replay", message, &report)
}

fn all_questions_unaddressed(config: &AppConfig) -> String {
    let guidance = &config.guidance;
    format!(
        "{}\n{}\n{}",
        guidance.addressed_header, guidance.unaddressed_header, guidance.question_template
    )
}

fn describe_attempt(attempt: RecommendationAttempt) -> String {
    match attempt {
        RecommendationAttempt::Suppressed => "suppressed".to_string(),
        RecommendationAttempt::Rejected(failure) => format!("rejected: {}", failure.reason_code),
        RecommendationAttempt::Screened(outcome) => {
            format!("screened: {}", RecommendationState::from(&outcome).as_str())
        }
        RecommendationAttempt::ProviderFailed { user_message } => {
            format!("provider failed: {user_message}")
        }
    }
}
