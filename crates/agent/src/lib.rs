//! Conversation session runtime for the advisor copilot.
//!
//! Each recognized utterance flows through a [`session::ConversationSession`]:
//! 1. **Enrichment** (`providers::NlpEnricher`) - key phrases, entities, PII, sentiment
//! 2. **Sentiment folding** - per-utterance score into the rolling aggregate
//! 3. **Cadence check** - guidance refresh and recommendation generation
//!
//! Generative calls go through `providers::GuidanceGenerator` and
//! `providers::RecommendationGenerator`; `llm` adapts any `LlmClient` to both.
//! No transport code lives here. Offline implementations (`lexicon`,
//! `llm::StaticLlmClient`) back the CLI replay command and the tests.

pub mod lexicon;
pub mod llm;
pub mod prompts;
pub mod providers;
pub mod registry;
pub mod session;

pub use lexicon::LexiconEnricher;
pub use llm::{LlmClient, LlmGuidanceGenerator, LlmRecommendationGenerator, StaticLlmClient};
pub use providers::{
    Enrichment, GuidanceGenerator, NlpEnricher, RecommendationGenerator, SentenceSentiment,
    SentimentDetail,
};
pub use registry::SessionRegistry;
pub use session::{
    Collaborators, ConversationSession, RecommendationAttempt, SessionPhase, SessionSettings,
    SessionSnapshot,
};
