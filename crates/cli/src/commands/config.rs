use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use copilot_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

struct Field {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    vec![
        Field {
            key_path: "cadence.guidance_every",
            value: config.cadence.guidance_every.to_string(),
            env_keys: &["COPILOT_CADENCE_GUIDANCE_EVERY"],
        },
        Field {
            key_path: "cadence.recommendation_every",
            value: config.cadence.recommendation_every.to_string(),
            env_keys: &["COPILOT_CADENCE_RECOMMENDATION_EVERY"],
        },
        Field {
            key_path: "cadence.min_transcript_chars",
            value: config.cadence.min_transcript_chars.to_string(),
            env_keys: &["COPILOT_CADENCE_MIN_TRANSCRIPT_CHARS"],
        },
        Field {
            key_path: "cadence.recommendations_enabled",
            value: config.cadence.recommendations_enabled.to_string(),
            env_keys: &["COPILOT_RECOMMENDATIONS_ENABLED"],
        },
        Field {
            key_path: "recommendation.min_transcript_chars",
            value: config.recommendation.min_transcript_chars.to_string(),
            env_keys: &["COPILOT_RECOMMENDATION_MIN_TRANSCRIPT_CHARS"],
        },
        Field {
            key_path: "recommendation.placeholder_text",
            value: config.recommendation.placeholder_text.clone(),
            env_keys: &["COPILOT_RECOMMENDATION_PLACEHOLDER_TEXT"],
        },
        Field {
            key_path: "guidance.addressed_header",
            value: config.guidance.addressed_header.clone(),
            env_keys: &["COPILOT_GUIDANCE_ADDRESSED_HEADER"],
        },
        Field {
            key_path: "guidance.unaddressed_header",
            value: config.guidance.unaddressed_header.clone(),
            env_keys: &["COPILOT_GUIDANCE_UNADDRESSED_HEADER"],
        },
        Field {
            key_path: "guidance.question_template",
            value: format!("<{} lines>", config.guidance.question_template.lines().count()),
            env_keys: &["COPILOT_GUIDANCE_QUESTION_TEMPLATE"],
        },
        Field {
            key_path: "alerts.display_secs",
            value: config.alerts.display_secs.to_string(),
            env_keys: &["COPILOT_ALERTS_DISPLAY_SECS"],
        },
        Field {
            key_path: "alerts.history_limit",
            value: optional(config.alerts.history_limit),
            env_keys: &["COPILOT_ALERTS_HISTORY_LIMIT"],
        },
        Field {
            key_path: "providers.enrichment_timeout_secs",
            value: config.providers.enrichment_timeout_secs.to_string(),
            env_keys: &["COPILOT_PROVIDERS_ENRICHMENT_TIMEOUT_SECS"],
        },
        Field {
            key_path: "providers.generation_timeout_secs",
            value: config.providers.generation_timeout_secs.to_string(),
            env_keys: &["COPILOT_PROVIDERS_GENERATION_TIMEOUT_SECS"],
        },
        Field {
            key_path: "session.max_transcript_chars",
            value: optional(config.session.max_transcript_chars),
            env_keys: &["COPILOT_SESSION_MAX_TRANSCRIPT_CHARS"],
        },
        Field {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["COPILOT_LOGGING_LEVEL", "COPILOT_LOG_LEVEL"],
        },
        Field {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["COPILOT_LOGGING_FORMAT", "COPILOT_LOG_FORMAT"],
        },
    ]
}

fn optional(value: Option<usize>) -> String {
    value.map(|value| value.to_string()).unwrap_or_else(|| "<unbounded>".to_string())
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("copilot.toml"), PathBuf::from("config/copilot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
