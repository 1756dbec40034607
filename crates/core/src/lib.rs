pub mod alerts;
pub mod cadence;
pub mod config;
pub mod domain;
pub mod errors;
pub mod guidance;
pub mod recommendation;
pub mod sentiment;

pub use alerts::{classify, RecommendationAlertManager};
pub use cadence::{CadenceController, RecommendationGate, RecommendationPermit};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::alert::{AlertId, AlertPriority, RecommendationAlert};
pub use domain::guidance::{GuidanceBoard, GuidanceTask, ParsedGuidance, TaskStatus};
pub use domain::sentiment::{
    AggregateSentiment, Confidence, CurrentSentiment, RollingSentiment, ScoredSentence,
    SentimentLabel, SentimentScore,
};
pub use domain::utterance::{ConversationCounters, SessionId, Transcript, Utterance};
pub use errors::{ApplicationError, DomainError};
pub use guidance::{GuidanceParser, GuidanceSections, ResponseExtractor, TwoSectionExtractor};
pub use recommendation::{
    screen_recommendation, validate_transcript, RecommendationOutcome, RecommendationState,
    ValidationFailure,
};
pub use sentiment::{aggregate, SentimentAggregator};
