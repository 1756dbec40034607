use serde::Serialize;

use copilot_core::config::{AppConfig, LoadOptions};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct DoctorReport {
    guidance_every: u64,
    recommendation_every: u64,
    recommendations_enabled: bool,
    guidance_template: String,
    question_count: usize,
    alert_display_secs: u64,
}

/// Loads config and builds every runtime component it configures.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("doctor", "config_validation", error.to_string(), 2)
        }
    };

    let parser = match config.guidance.parser() {
        Ok(parser) => parser,
        Err(error) => return CommandResult::failure("doctor", "guidance", error.to_string(), 2),
    };
    if let Err(error) = config.cadence.controller() {
        return CommandResult::failure("doctor", "cadence", error.to_string(), 2);
    }

    let report = DoctorReport {
        guidance_every: config.cadence.guidance_every,
        recommendation_every: config.cadence.recommendation_every,
        recommendations_enabled: config.cadence.recommendations_enabled,
        guidance_template: parser.template_name().to_string(),
        question_count: config
            .guidance
            .question_template
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count(),
        alert_display_secs: config.alerts.display_secs,
    };
    CommandResult::success_with_data("doctor", "configuration is ready", &report)
}
