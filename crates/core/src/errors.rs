use std::time::Duration;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(
        "cadence intervals must be positive (guidance_every={guidance_every}, recommendation_every={recommendation_every})"
    )]
    InvalidCadence { guidance_every: u64, recommendation_every: u64 },
    #[error("guidance headers must be non-empty and distinct")]
    InvalidGuidanceHeaders,
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{provider} provider failure: {message}")]
    Provider { provider: &'static str, message: String },
    #[error("{provider} provider timed out after {elapsed:?}")]
    Timeout { provider: &'static str, elapsed: Duration },
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn provider(provider: &'static str, error: impl std::fmt::Display) -> Self {
        Self::Provider { provider, message: error.to_string() }
    }

    /// Short text suitable for a UI state slot.
    pub fn user_message(&self) -> String {
        match self {
            Self::Domain(_) => "The conversation state could not be updated.".to_string(),
            Self::Provider { provider, .. } => {
                format!("The {provider} service is unavailable right now. Please try again shortly.")
            }
            Self::Timeout { provider, .. } => {
                format!("The {provider} service took too long to respond. Please try again shortly.")
            }
            Self::Configuration(_) => "The copilot is misconfigured.".to_string(),
        }
    }
}
