use std::path::Path;

use copilot_core::config::{AppConfig, LoadOptions};
use copilot_core::domain::guidance::ParsedGuidance;

use crate::commands::{read_input, CommandResult};

/// Splits a raw guidance answer into completed and pending tasks.
pub fn run(input: Option<&Path>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "parse-guidance",
                "config_validation",
                error.to_string(),
                2,
            )
        }
    };
    let parser = match config.guidance.parser() {
        Ok(parser) => parser,
        Err(error) => {
            return CommandResult::failure("parse-guidance", "guidance", error.to_string(), 2)
        }
    };

    let raw = match read_input(input) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure("parse-guidance", "input", format!("{error:#}"), 3)
        }
    };

    let parsed: ParsedGuidance = parser.parse(&raw);
    CommandResult::success_with_data(
        "parse-guidance",
        format!(
            "{} completed, {} pending ({})",
            parsed.completed.len(),
            parsed.pending.len(),
            parser.template_name()
        ),
        &parsed,
    )
}
