use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cadence::CadenceController;
use crate::errors::DomainError;
use crate::guidance::extractor::{DEFAULT_ADDRESSED_HEADER, DEFAULT_UNADDRESSED_HEADER};
use crate::guidance::GuidanceParser;
use crate::recommendation::DEFAULT_PLACEHOLDER_TEXT;

pub const DEFAULT_QUESTION_TEMPLATE: &str = "\
1. What are the client's primary financial goals?
2. What is the client's investment time horizon?
3. How would the client describe their risk tolerance?
4. What is the client's current income and employment situation?
5. What existing savings, investments, or retirement accounts does the client hold?
6. Does the client carry any significant debts or liabilities?
7. Are there upcoming major expenses or liquidity needs?
8. Does the client have any ethical or sector preferences for investments?";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub cadence: CadenceConfig,
    pub recommendation: RecommendationConfig,
    pub guidance: GuidanceConfig,
    pub alerts: AlertConfig,
    pub providers: ProviderConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CadenceConfig {
    pub guidance_every: u64,
    pub recommendation_every: u64,
    pub min_transcript_chars: usize,
    pub recommendations_enabled: bool,
}

#[derive(Clone, Debug)]
pub struct RecommendationConfig {
    pub min_transcript_chars: usize,
    pub placeholder_text: String,
}

#[derive(Clone, Debug)]
pub struct GuidanceConfig {
    pub addressed_header: String,
    pub unaddressed_header: String,
    pub question_template: String,
}

#[derive(Clone, Debug)]
pub struct AlertConfig {
    pub display_secs: u64,
    pub history_limit: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub enrichment_timeout_secs: u64,
    pub generation_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub max_transcript_chars: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub recommendations_enabled: Option<bool>,
    pub question_template: Option<String>,
    pub max_transcript_chars: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cadence: CadenceConfig {
                guidance_every: 2,
                recommendation_every: 4,
                min_transcript_chars: 150,
                recommendations_enabled: true,
            },
            recommendation: RecommendationConfig {
                min_transcript_chars: 20,
                placeholder_text: DEFAULT_PLACEHOLDER_TEXT.to_string(),
            },
            guidance: GuidanceConfig {
                addressed_header: DEFAULT_ADDRESSED_HEADER.to_string(),
                unaddressed_header: DEFAULT_UNADDRESSED_HEADER.to_string(),
                question_template: DEFAULT_QUESTION_TEMPLATE.to_string(),
            },
            alerts: AlertConfig { display_secs: 5, history_limit: None },
            providers: ProviderConfig { enrichment_timeout_secs: 10, generation_timeout_secs: 60 },
            session: SessionConfig { max_transcript_chars: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl CadenceConfig {
    pub fn controller(&self) -> Result<CadenceController, DomainError> {
        CadenceController::new(
            self.guidance_every,
            self.recommendation_every,
            self.min_transcript_chars,
        )
    }
}

impl GuidanceConfig {
    pub fn parser(&self) -> Result<GuidanceParser, DomainError> {
        GuidanceParser::with_headers(&self.addressed_header, &self.unaddressed_header)
    }
}

impl AlertConfig {
    pub fn display_duration(&self) -> Duration {
        Duration::from_secs(self.display_secs)
    }
}

impl ProviderConfig {
    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_secs(self.enrichment_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("copilot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(cadence) = patch.cadence {
            if let Some(guidance_every) = cadence.guidance_every {
                self.cadence.guidance_every = guidance_every;
            }
            if let Some(recommendation_every) = cadence.recommendation_every {
                self.cadence.recommendation_every = recommendation_every;
            }
            if let Some(min_transcript_chars) = cadence.min_transcript_chars {
                self.cadence.min_transcript_chars = min_transcript_chars;
            }
            if let Some(enabled) = cadence.recommendations_enabled {
                self.cadence.recommendations_enabled = enabled;
            }
        }

        if let Some(recommendation) = patch.recommendation {
            if let Some(min_transcript_chars) = recommendation.min_transcript_chars {
                self.recommendation.min_transcript_chars = min_transcript_chars;
            }
            if let Some(placeholder_text) = recommendation.placeholder_text {
                self.recommendation.placeholder_text = placeholder_text;
            }
        }

        if let Some(guidance) = patch.guidance {
            if let Some(addressed_header) = guidance.addressed_header {
                self.guidance.addressed_header = addressed_header;
            }
            if let Some(unaddressed_header) = guidance.unaddressed_header {
                self.guidance.unaddressed_header = unaddressed_header;
            }
            if let Some(question_template) = guidance.question_template {
                self.guidance.question_template = question_template;
            }
        }

        if let Some(alerts) = patch.alerts {
            if let Some(display_secs) = alerts.display_secs {
                self.alerts.display_secs = display_secs;
            }
            if let Some(history_limit) = alerts.history_limit {
                self.alerts.history_limit = Some(history_limit);
            }
        }

        if let Some(providers) = patch.providers {
            if let Some(timeout_secs) = providers.enrichment_timeout_secs {
                self.providers.enrichment_timeout_secs = timeout_secs;
            }
            if let Some(timeout_secs) = providers.generation_timeout_secs {
                self.providers.generation_timeout_secs = timeout_secs;
            }
        }

        if let Some(session) = patch.session {
            if let Some(max_transcript_chars) = session.max_transcript_chars {
                self.session.max_transcript_chars = Some(max_transcript_chars);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COPILOT_CADENCE_GUIDANCE_EVERY") {
            self.cadence.guidance_every = parse_u64("COPILOT_CADENCE_GUIDANCE_EVERY", &value)?;
        }
        if let Some(value) = read_env("COPILOT_CADENCE_RECOMMENDATION_EVERY") {
            self.cadence.recommendation_every =
                parse_u64("COPILOT_CADENCE_RECOMMENDATION_EVERY", &value)?;
        }
        if let Some(value) = read_env("COPILOT_CADENCE_MIN_TRANSCRIPT_CHARS") {
            self.cadence.min_transcript_chars =
                parse_usize("COPILOT_CADENCE_MIN_TRANSCRIPT_CHARS", &value)?;
        }
        if let Some(value) = read_env("COPILOT_RECOMMENDATIONS_ENABLED") {
            self.cadence.recommendations_enabled =
                parse_bool("COPILOT_RECOMMENDATIONS_ENABLED", &value)?;
        }

        if let Some(value) = read_env("COPILOT_RECOMMENDATION_MIN_TRANSCRIPT_CHARS") {
            self.recommendation.min_transcript_chars =
                parse_usize("COPILOT_RECOMMENDATION_MIN_TRANSCRIPT_CHARS", &value)?;
        }
        if let Some(value) = read_env("COPILOT_RECOMMENDATION_PLACEHOLDER_TEXT") {
            self.recommendation.placeholder_text = value;
        }

        if let Some(value) = read_env("COPILOT_GUIDANCE_ADDRESSED_HEADER") {
            self.guidance.addressed_header = value;
        }
        if let Some(value) = read_env("COPILOT_GUIDANCE_UNADDRESSED_HEADER") {
            self.guidance.unaddressed_header = value;
        }
        if let Some(value) = read_env("COPILOT_GUIDANCE_QUESTION_TEMPLATE") {
            self.guidance.question_template = value;
        }

        if let Some(value) = read_env("COPILOT_ALERTS_DISPLAY_SECS") {
            self.alerts.display_secs = parse_u64("COPILOT_ALERTS_DISPLAY_SECS", &value)?;
        }
        if let Some(value) = read_env("COPILOT_ALERTS_HISTORY_LIMIT") {
            self.alerts.history_limit = Some(parse_usize("COPILOT_ALERTS_HISTORY_LIMIT", &value)?);
        }

        if let Some(value) = read_env("COPILOT_PROVIDERS_ENRICHMENT_TIMEOUT_SECS") {
            self.providers.enrichment_timeout_secs =
                parse_u64("COPILOT_PROVIDERS_ENRICHMENT_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("COPILOT_PROVIDERS_GENERATION_TIMEOUT_SECS") {
            self.providers.generation_timeout_secs =
                parse_u64("COPILOT_PROVIDERS_GENERATION_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COPILOT_SESSION_MAX_TRANSCRIPT_CHARS") {
            self.session.max_transcript_chars =
                Some(parse_usize("COPILOT_SESSION_MAX_TRANSCRIPT_CHARS", &value)?);
        }

        let log_level = read_env("COPILOT_LOGGING_LEVEL").or_else(|| read_env("COPILOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COPILOT_LOGGING_FORMAT").or_else(|| read_env("COPILOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(enabled) = overrides.recommendations_enabled {
            self.cadence.recommendations_enabled = enabled;
        }
        if let Some(question_template) = overrides.question_template {
            self.guidance.question_template = question_template;
        }
        if let Some(max_transcript_chars) = overrides.max_transcript_chars {
            self.session.max_transcript_chars = Some(max_transcript_chars);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_cadence(&self.cadence)?;
        validate_guidance(&self.guidance)?;
        validate_alerts(&self.alerts)?;
        validate_providers(&self.providers)?;
        validate_session(&self.session)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("copilot.toml"), PathBuf::from("config/copilot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_cadence(cadence: &CadenceConfig) -> Result<(), ConfigError> {
    if cadence.guidance_every == 0 {
        return Err(ConfigError::Validation(
            "cadence.guidance_every must be greater than zero".to_string(),
        ));
    }
    if cadence.recommendation_every == 0 {
        return Err(ConfigError::Validation(
            "cadence.recommendation_every must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_guidance(guidance: &GuidanceConfig) -> Result<(), ConfigError> {
    let addressed = guidance.addressed_header.trim();
    let unaddressed = guidance.unaddressed_header.trim();
    if addressed.is_empty() || unaddressed.is_empty() {
        return Err(ConfigError::Validation(
            "guidance.addressed_header and guidance.unaddressed_header must be non-empty"
                .to_string(),
        ));
    }
    if addressed == unaddressed {
        return Err(ConfigError::Validation(
            "guidance.addressed_header and guidance.unaddressed_header must differ".to_string(),
        ));
    }
    if guidance.question_template.trim().is_empty() {
        return Err(ConfigError::Validation(
            "guidance.question_template must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_alerts(alerts: &AlertConfig) -> Result<(), ConfigError> {
    if alerts.display_secs == 0 || alerts.display_secs > 300 {
        return Err(ConfigError::Validation(
            "alerts.display_secs must be in range 1..=300".to_string(),
        ));
    }
    if alerts.history_limit == Some(0) {
        return Err(ConfigError::Validation(
            "alerts.history_limit must be greater than zero when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_providers(providers: &ProviderConfig) -> Result<(), ConfigError> {
    if providers.enrichment_timeout_secs == 0 || providers.enrichment_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "providers.enrichment_timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if providers.generation_timeout_secs == 0 || providers.generation_timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "providers.generation_timeout_secs must be in range 1..=600".to_string(),
        ));
    }
    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.max_transcript_chars == Some(0) {
        return Err(ConfigError::Validation(
            "session.max_transcript_chars must be greater than zero when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    cadence: Option<CadencePatch>,
    recommendation: Option<RecommendationPatch>,
    guidance: Option<GuidancePatch>,
    alerts: Option<AlertPatch>,
    providers: Option<ProviderPatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CadencePatch {
    guidance_every: Option<u64>,
    recommendation_every: Option<u64>,
    min_transcript_chars: Option<usize>,
    recommendations_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    min_transcript_chars: Option<usize>,
    placeholder_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GuidancePatch {
    addressed_header: Option<String>,
    unaddressed_header: Option<String>,
    question_template: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertPatch {
    display_secs: Option<u64>,
    history_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderPatch {
    enrichment_timeout_secs: Option<u64>,
    generation_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    max_transcript_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
