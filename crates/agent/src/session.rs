use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use copilot_core::alerts::RecommendationAlertManager;
use copilot_core::cadence::{CadenceController, RecommendationGate};
use copilot_core::config::AppConfig;
use copilot_core::domain::alert::{AlertId, RecommendationAlert};
use copilot_core::domain::guidance::GuidanceBoard;
use copilot_core::domain::sentiment::{CurrentSentiment, RollingSentiment};
use copilot_core::domain::utterance::{ConversationCounters, SessionId, Transcript, Utterance};
use copilot_core::errors::{ApplicationError, DomainError};
use copilot_core::guidance::GuidanceParser;
use copilot_core::recommendation::{
    screen_recommendation, validate_transcript, RecommendationOutcome, RecommendationState,
    ValidationFailure, DEFAULT_PLACEHOLDER_TEXT,
};
use copilot_core::sentiment::SentimentAggregator;

use crate::providers::{Enrichment, GuidanceGenerator, NlpEnricher, RecommendationGenerator};

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub cadence: CadenceController,
    pub parser: GuidanceParser,
    pub question_template: String,
    pub recommendations_enabled: bool,
    pub placeholder_text: String,
    pub recommendation_min_chars: usize,
    pub alert_display: Duration,
    pub alert_history_limit: Option<usize>,
    pub enrichment_timeout: Duration,
    pub generation_timeout: Duration,
    pub max_transcript_chars: Option<usize>,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        Ok(Self {
            cadence: config.cadence.controller()?,
            parser: config.guidance.parser()?,
            question_template: config.guidance.question_template.clone(),
            recommendations_enabled: config.cadence.recommendations_enabled,
            placeholder_text: config.recommendation.placeholder_text.clone(),
            recommendation_min_chars: config.recommendation.min_transcript_chars,
            alert_display: config.alerts.display_duration(),
            alert_history_limit: config.alerts.history_limit,
            enrichment_timeout: config.providers.enrichment_timeout(),
            generation_timeout: config.providers.generation_timeout(),
            max_transcript_chars: config.session.max_transcript_chars,
        })
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cadence: CadenceController::default(),
            parser: GuidanceParser::default(),
            question_template: copilot_core::config::DEFAULT_QUESTION_TEMPLATE.to_string(),
            recommendations_enabled: true,
            placeholder_text: DEFAULT_PLACEHOLDER_TEXT.to_string(),
            recommendation_min_chars: 20,
            alert_display: Duration::from_secs(5),
            alert_history_limit: None,
            enrichment_timeout: Duration::from_secs(10),
            generation_timeout: Duration::from_secs(60),
            max_transcript_chars: None,
        }
    }
}

#[derive(Clone)]
pub struct Collaborators {
    pub enricher: Arc<dyn NlpEnricher>,
    pub guidance: Arc<dyn GuidanceGenerator>,
    pub recommendation: Arc<dyn RecommendationGenerator>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Listening,
    Stopped,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listening => "listening",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationInsights {
    pub key_phrases: String,
    pub entities: String,
    pub pii_redacted: String,
}

/// Read-only view of a session, published after every state change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub phase: SessionPhase,
    pub transcript: String,
    pub transcript_event_count: u64,
    pub last_utterance: Option<Utterance>,
    pub insights: Option<ConversationInsights>,
    pub current_sentiment: Option<CurrentSentiment>,
    pub rolling_sentiment: RollingSentiment,
    pub guidance: GuidanceBoard,
    pub recommendation: RecommendationState,
    pub alerts: Vec<RecommendationAlert>,
    pub unread_alerts: usize,
    pub alert_visible: bool,
    pub recommendations_enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecommendationAttempt {
    /// Another generation already holds the gate.
    Suppressed,
    Rejected(ValidationFailure),
    Screened(RecommendationOutcome),
    ProviderFailed { user_message: String },
}

struct SessionState {
    session_id: SessionId,
    phase: SessionPhase,
    transcript: Transcript,
    counters: ConversationCounters,
    last_utterance: Option<Utterance>,
    insights: Option<ConversationInsights>,
    current_sentiment: Option<CurrentSentiment>,
    sentiment: SentimentAggregator,
    guidance: GuidanceBoard,
    guidance_applied_at_count: u64,
    recommendation: RecommendationState,
    alerts: RecommendationAlertManager,
    recommendations_enabled: bool,
}

impl SessionState {
    fn new(session_id: SessionId, settings: &SessionSettings) -> Self {
        Self {
            session_id,
            phase: SessionPhase::Listening,
            transcript: Transcript::new(settings.max_transcript_chars),
            counters: ConversationCounters::default(),
            last_utterance: None,
            insights: None,
            current_sentiment: None,
            sentiment: SentimentAggregator::new(),
            guidance: GuidanceBoard::default(),
            guidance_applied_at_count: 0,
            recommendation: RecommendationState::Idle,
            alerts: RecommendationAlertManager::new(settings.alert_history_limit),
            recommendations_enabled: settings.recommendations_enabled,
        }
    }

    fn apply_enrichment(&mut self, utterance: &str, enrichment: Enrichment) {
        self.insights = Some(ConversationInsights {
            key_phrases: enrichment.key_phrases,
            entities: enrichment.entities,
            pii_redacted: enrichment.pii_redacted,
        });

        let Some(detail) = enrichment.sentiment else {
            return;
        };

        let first = detail.sentences.into_iter().next();
        let sentence = first.as_ref().map_or_else(|| utterance.to_string(), |s| s.text.clone());
        self.current_sentiment = Some(CurrentSentiment { score: detail.overall, sentence });

        if let Some(first) = first {
            self.sentiment.append_sentence(first.text, first.score, Utc::now());
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            phase: self.phase,
            transcript: self.transcript.as_str().to_string(),
            transcript_event_count: self.counters.transcript_event_count,
            last_utterance: self.last_utterance.clone(),
            insights: self.insights.clone(),
            current_sentiment: self.current_sentiment.clone(),
            rolling_sentiment: self.sentiment.snapshot(),
            guidance: self.guidance.clone(),
            recommendation: self.recommendation.clone(),
            alerts: self.alerts.history().to_vec(),
            unread_alerts: self.alerts.unread_count(),
            alert_visible: self.alerts.is_alert_visible(),
            recommendations_enabled: self.recommendations_enabled,
        }
    }
}

/// One live advisor conversation.
///
/// State sits behind a single async mutex that is never held across a provider call,
/// so utterances keep flowing while guidance or recommendations are generated.
pub struct ConversationSession {
    id: SessionId,
    settings: SessionSettings,
    collaborators: Collaborators,
    gate: RecommendationGate,
    state: Arc<Mutex<SessionState>>,
    updates: Arc<watch::Sender<SessionSnapshot>>,
}

impl ConversationSession {
    pub fn new(id: SessionId, settings: SessionSettings, collaborators: Collaborators) -> Self {
        let state = SessionState::new(id.clone(), &settings);
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            id,
            settings,
            collaborators,
            gate: RecommendationGate::new(),
            state: Arc::new(Mutex::new(state)),
            updates: Arc::new(updates),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Fire-and-forget entry point. Spawned handlers are not ordered relative to each other.
    pub fn spawn_utterance(self: &Arc<Self>, text: impl Into<String>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        let text = text.into();
        tokio::spawn(async move { session.on_utterance_recognized(&text).await })
    }

    pub async fn on_utterance_recognized(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            debug!(
                event_name = "session.utterance.ignored",
                session_id = %self.id,
                reason = "empty",
                "blank utterance ignored"
            );
            return;
        }

        let (count, transcript_len) = {
            let mut state = self.state.lock().await;
            if state.phase == SessionPhase::Stopped {
                debug!(
                    event_name = "session.utterance.ignored",
                    session_id = %self.id,
                    reason = "stopped",
                    "utterance arrived after stop"
                );
                return;
            }

            state.transcript.append(text);
            let count = state.counters.record_event();
            state.last_utterance = Some(Utterance { text: text.to_string(), sequence_number: count });
            self.publish(&state);
            (count, state.transcript.char_len())
        };

        info!(
            event_name = "session.utterance.recorded",
            session_id = %self.id,
            sequence_number = count,
            transcript_chars = transcript_len,
            "utterance recorded"
        );

        let enrichment = self.enrich(text).await;
        {
            let mut state = self.state.lock().await;
            state.apply_enrichment(text, enrichment);
            self.publish(&state);
        }

        if self.settings.cadence.should_trigger_guidance(count) {
            self.refresh_guidance().await;
        }

        let enabled = self.state.lock().await.recommendations_enabled;
        if self.settings.cadence.should_trigger_recommendation(count, transcript_len, enabled) {
            self.request_recommendation().await;
        }
    }

    /// Regenerates the guidance board from the full transcript.
    ///
    /// On provider failure the previous task lists stay in place and a notice is set.
    pub async fn refresh_guidance(&self) {
        let (transcript, requested_at_count) = {
            let state = self.state.lock().await;
            (state.transcript.as_str().to_string(), state.counters.transcript_event_count)
        };
        if transcript.trim().is_empty() {
            debug!(
                event_name = "session.guidance.skipped",
                session_id = %self.id,
                "guidance skipped for empty transcript"
            );
            return;
        }

        let result = call_provider(
            "guidance",
            self.settings.generation_timeout,
            self.collaborators
                .guidance
                .generate_guidance(&transcript, &self.settings.question_template),
        )
        .await;

        let mut state = self.state.lock().await;
        match result {
            Ok(raw) => {
                if requested_at_count < state.guidance_applied_at_count {
                    debug!(
                        event_name = "session.guidance.stale",
                        session_id = %self.id,
                        requested_at_count,
                        applied_at_count = state.guidance_applied_at_count,
                        "older guidance response discarded"
                    );
                    return;
                }

                let parsed = self.settings.parser.parse(&raw);
                info!(
                    event_name = "session.guidance.refreshed",
                    session_id = %self.id,
                    template = self.settings.parser.template_name(),
                    completed = parsed.completed.len(),
                    pending = parsed.pending.len(),
                    "guidance board replaced"
                );
                state.guidance.replace(parsed, Utc::now());
                state.guidance_applied_at_count = requested_at_count;
            }
            Err(error) => {
                warn!(
                    event_name = "session.guidance.failed",
                    session_id = %self.id,
                    error = %error,
                    "guidance generation failed; keeping previous tasks"
                );
                state.guidance.set_notice(error.user_message());
            }
        }
        self.publish(&state);
    }

    /// Runs one recommendation generation if the gate is free.
    pub async fn request_recommendation(&self) -> RecommendationAttempt {
        let Some(_permit) = self.gate.try_acquire() else {
            debug!(
                event_name = "session.recommendation.suppressed",
                session_id = %self.id,
                "recommendation already in flight"
            );
            return RecommendationAttempt::Suppressed;
        };

        let transcript = {
            let mut state = self.state.lock().await;
            let transcript = state.transcript.as_str().to_string();
            if let Err(failure) = validate_transcript(
                &transcript,
                &self.settings.placeholder_text,
                self.settings.recommendation_min_chars,
            ) {
                info!(
                    event_name = "session.recommendation.rejected",
                    session_id = %self.id,
                    reason_code = failure.reason_code,
                    "recommendation skipped by transcript validation"
                );
                state.recommendation = RecommendationState::Skipped(failure.user_message.clone());
                self.publish(&state);
                return RecommendationAttempt::Rejected(failure);
            }

            state.recommendation = RecommendationState::Generating;
            self.publish(&state);
            transcript
        };

        let result = call_provider(
            "recommendation",
            self.settings.generation_timeout,
            self.collaborators.recommendation.generate_recommendation(&transcript),
        )
        .await;

        let mut state = self.state.lock().await;
        let attempt = match result {
            Ok(raw) => {
                let outcome = screen_recommendation(&raw);
                state.recommendation = RecommendationState::from(&outcome);
                if let RecommendationOutcome::Ready { content, priority } = &outcome {
                    let alert = state.alerts.record(content.clone(), *priority);
                    info!(
                        event_name = "session.recommendation.alerted",
                        session_id = %self.id,
                        alert_id = %alert.id.0,
                        priority = alert.priority.as_str(),
                        "recommendation alert recorded"
                    );
                    self.schedule_alert_hide();
                } else {
                    info!(
                        event_name = "session.recommendation.screened",
                        session_id = %self.id,
                        state = state.recommendation.as_str(),
                        "recommendation withheld from alerts"
                    );
                }
                RecommendationAttempt::Screened(outcome)
            }
            Err(error) => {
                warn!(
                    event_name = "session.recommendation.failed",
                    session_id = %self.id,
                    error = %error,
                    "recommendation generation failed"
                );
                let user_message = error.user_message();
                state.recommendation = RecommendationState::Failed(user_message.clone());
                RecommendationAttempt::ProviderFailed { user_message }
            }
        };
        self.publish(&state);
        attempt
    }

    /// Stops accepting utterances and runs the end-of-session flush.
    ///
    /// Returns `None` when the session was already stopped. The flush yields
    /// `Suppressed` when a cadence-triggered generation still holds the gate; that
    /// generation's outcome stands in for the final pass.
    pub async fn stop(&self) -> Option<RecommendationAttempt> {
        {
            let mut state = self.state.lock().await;
            if state.phase == SessionPhase::Stopped {
                return None;
            }
            state.phase = SessionPhase::Stopped;
            self.publish(&state);
        }

        info!(event_name = "session.stopped", session_id = %self.id, "session stopping; flushing");

        let attempt = self.request_recommendation().await;
        self.refresh_guidance().await;
        Some(attempt)
    }

    pub async fn set_recommendations_enabled(&self, enabled: bool) {
        let mut state = self.state.lock().await;
        state.recommendations_enabled = enabled;
        self.publish(&state);
    }

    pub async fn mark_alert_read(&self, id: &AlertId) -> bool {
        let mut state = self.state.lock().await;
        let changed = state.alerts.mark_read(id);
        if changed {
            self.publish(&state);
        }
        changed
    }

    pub async fn mark_all_alerts_read(&self) {
        let mut state = self.state.lock().await;
        state.alerts.mark_all_read();
        self.publish(&state);
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    async fn enrich(&self, text: &str) -> Enrichment {
        let result = call_provider(
            "enrichment",
            self.settings.enrichment_timeout,
            self.collaborators.enricher.enrich(text),
        )
        .await;

        result.unwrap_or_else(|error| {
            warn!(
                event_name = "session.enrichment.unavailable",
                session_id = %self.id,
                error = %error,
                "enrichment failed; substituting sentinel"
            );
            Enrichment::unavailable()
        })
    }

    /// One-shot timer; each alert gets its own and none is renewed.
    fn schedule_alert_hide(&self) {
        let state = Arc::clone(&self.state);
        let updates = Arc::clone(&self.updates);
        let delay = self.settings.alert_display;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = state.lock().await;
            state.alerts.hide_alert();
            updates.send_replace(state.snapshot());
        });
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(state.snapshot());
    }
}

async fn call_provider<T, F>(
    provider: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, ApplicationError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(ApplicationError::provider(provider, error)),
        Err(_) => Err(ApplicationError::Timeout { provider, elapsed: limit }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use tokio::sync::{Mutex, Notify};

    use copilot_core::domain::alert::AlertPriority;
    use copilot_core::domain::sentiment::SentimentLabel;
    use copilot_core::domain::utterance::SessionId;
    use copilot_core::recommendation::{RecommendationOutcome, RecommendationState};

    use super::{
        Collaborators, ConversationSession, RecommendationAttempt, SessionPhase, SessionSettings,
    };
    use crate::lexicon::LexiconEnricher;
    use crate::providers::{Enrichment, GuidanceGenerator, NlpEnricher, RecommendationGenerator};

    const GUIDANCE_ANSWER: &str = "Addressed Questions\n1. What is your goal? - Retire safely\n\
                                   Unaddressed Questions\n1. What is your time horizon?";

    struct ScriptedGuidance {
        answers: Mutex<VecDeque<Result<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedGuidance {
        fn always(answer: &str) -> Self {
            Self::new((0..8).map(|_| Ok(answer.to_string())).collect())
        }

        fn new(answers: Vec<Result<String>>) -> Self {
            Self { answers: Mutex::new(answers.into()), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl GuidanceGenerator for ScriptedGuidance {
        async fn generate_guidance(&self, _transcript: &str, _template: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("no scripted guidance left")))
        }
    }

    struct ScriptedRecommendation {
        answer: std::result::Result<String, String>,
        release: Option<Arc<Notify>>,
        calls: AtomicUsize,
    }

    impl ScriptedRecommendation {
        fn answering(answer: &str) -> Self {
            Self { answer: Ok(answer.to_string()), release: None, calls: AtomicUsize::new(0) }
        }

        fn failing(message: &str) -> Self {
            Self { answer: Err(message.to_string()), release: None, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl RecommendationGenerator for ScriptedRecommendation {
        async fn generate_recommendation(&self, _transcript: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(release) = &self.release {
                release.notified().await;
            }
            self.answer.clone().map_err(|message| anyhow!(message))
        }
    }

    struct FailingEnricher;

    #[async_trait]
    impl NlpEnricher for FailingEnricher {
        async fn enrich(&self, _utterance: &str) -> Result<Enrichment> {
            Err(anyhow!("enrichment service unreachable"))
        }
    }

    struct SlowEnricher;

    #[async_trait]
    impl NlpEnricher for SlowEnricher {
        async fn enrich(&self, utterance: &str) -> Result<Enrichment> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            LexiconEnricher::new().enrich(utterance).await
        }
    }

    fn session_with(
        settings: SessionSettings,
        enricher: Arc<dyn NlpEnricher>,
        guidance: Arc<ScriptedGuidance>,
        recommendation: Arc<ScriptedRecommendation>,
    ) -> ConversationSession {
        ConversationSession::new(
            SessionId("session-test".to_string()),
            settings,
            Collaborators { enricher, guidance, recommendation },
        )
    }

    fn lexicon() -> Arc<dyn NlpEnricher> {
        Arc::new(LexiconEnricher::new())
    }

    #[tokio::test]
    async fn two_utterances_trigger_guidance_and_track_sentiment() {
        let guidance = Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER));
        let recommendation = Arc::new(ScriptedRecommendation::answering("Consider bonds."));
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            guidance.clone(),
            recommendation.clone(),
        );

        session.on_utterance_recognized("I'm worried about my retirement savings").await;
        assert_eq!(guidance.calls.load(Ordering::SeqCst), 0);

        session.on_utterance_recognized("I want something safe and conservative").await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.transcript_event_count, 2);
        assert_eq!(guidance.calls.load(Ordering::SeqCst), 1);
        assert_eq!(recommendation.calls.load(Ordering::SeqCst), 0);
        assert_eq!(snapshot.rolling_sentiment.all_sentences.len(), 2);
        assert_ne!(snapshot.rolling_sentiment.overall.label, SentimentLabel::Positive);
        assert_eq!(
            snapshot.transcript,
            "I'm worried about my retirement savings\nI want something safe and conservative"
        );

        assert_eq!(snapshot.guidance.completed.len(), 1);
        assert_eq!(snapshot.guidance.completed[0].question_text, "What is your goal?");
        assert_eq!(snapshot.guidance.completed[0].answer_text.as_deref(), Some("Retire safely"));
        assert_eq!(snapshot.guidance.pending.len(), 1);
        assert!(snapshot.guidance.generated_at.is_some());
    }

    #[tokio::test]
    async fn blank_utterances_are_ignored() {
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            Arc::new(ScriptedRecommendation::answering("Consider bonds.")),
        );

        session.on_utterance_recognized("   ").await;
        session.on_utterance_recognized("").await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.transcript_event_count, 0);
        assert!(snapshot.transcript.is_empty());
        assert!(snapshot.last_utterance.is_none());
    }

    #[tokio::test]
    async fn enrichment_failure_substitutes_sentinel_and_continues() {
        let session = session_with(
            SessionSettings::default(),
            Arc::new(FailingEnricher),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            Arc::new(ScriptedRecommendation::answering("Consider bonds.")),
        );

        session.on_utterance_recognized("My pension is with Vanguard").await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.transcript_event_count, 1);
        let insights = snapshot.insights.expect("insights recorded");
        assert_eq!(insights.key_phrases, "NoKP");
        assert_eq!(insights.entities, "NoEnt");
        assert!(snapshot.current_sentiment.is_none());
        assert!(snapshot.rolling_sentiment.all_sentences.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn enrichment_timeout_fails_open() {
        let settings = SessionSettings {
            enrichment_timeout: Duration::from_secs(2),
            ..SessionSettings::default()
        };
        let session = session_with(
            settings,
            Arc::new(SlowEnricher),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            Arc::new(ScriptedRecommendation::answering("Consider bonds.")),
        );

        session.on_utterance_recognized("I'm worried").await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.insights.map(|insights| insights.key_phrases).as_deref(), Some("NoKP"));
        assert!(snapshot.rolling_sentiment.all_sentences.is_empty());
    }

    #[tokio::test]
    async fn guidance_failure_keeps_previous_tasks_and_sets_notice() {
        let guidance = Arc::new(ScriptedGuidance::new(vec![
            Ok(GUIDANCE_ANSWER.to_string()),
            Err(anyhow!("model overloaded")),
        ]));
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            guidance,
            Arc::new(ScriptedRecommendation::answering("Consider bonds.")),
        );

        session.on_utterance_recognized("We plan to retire in ten years").await;
        session.refresh_guidance().await;
        let before = session.snapshot().await.guidance;
        assert!(before.notice.is_none());

        session.refresh_guidance().await;
        let after = session.snapshot().await.guidance;
        assert_eq!(after.completed, before.completed);
        assert_eq!(after.pending, before.pending);
        assert_eq!(
            after.notice.as_deref(),
            Some("The guidance service is unavailable right now. Please try again shortly.")
        );
    }

    #[tokio::test]
    async fn fourth_long_utterance_records_alert() {
        let recommendation =
            Arc::new(ScriptedRecommendation::answering("Urgent: rebalance into bonds."));
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            recommendation.clone(),
        );

        for line in [
            "We are both fifty five and want to retire at sixty two.",
            "Most of our savings sit in a single technology stock right now.",
            "We also hold a small pension and some cash in a savings account.",
        ] {
            session.on_utterance_recognized(line).await;
        }
        assert_eq!(recommendation.calls.load(Ordering::SeqCst), 0);

        session.on_utterance_recognized("We are nervous about market swings.").await;

        let snapshot = session.snapshot().await;
        assert_eq!(recommendation.calls.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.alerts[0].priority, AlertPriority::High);
        assert_eq!(snapshot.unread_alerts, 1);
        assert!(snapshot.alert_visible);
        assert_eq!(
            snapshot.recommendation,
            RecommendationState::Ready("Urgent: rebalance into bonds.".to_string())
        );
    }

    #[tokio::test]
    async fn disabled_recommendations_skip_cadence_path() {
        let recommendation = Arc::new(ScriptedRecommendation::answering("Consider bonds."));
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            recommendation.clone(),
        );
        session.set_recommendations_enabled(false).await;

        for _ in 0..4 {
            session
                .on_utterance_recognized("We would like a long and detailed review of our plans.")
                .await;
        }

        assert_eq!(recommendation.calls.load(Ordering::SeqCst), 0);
        assert!(!session.snapshot().await.recommendations_enabled);
    }

    #[tokio::test]
    async fn waiting_and_error_answers_never_become_alerts() {
        for (answer, expected) in [
            ("***Waiting for More Client Information***", "waiting"),
            ("Error: upstream rejected the request", "failed"),
        ] {
            let session = session_with(
                SessionSettings::default(),
                lexicon(),
                Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
                Arc::new(ScriptedRecommendation::answering(answer)),
            );
            session.on_utterance_recognized("We have a mortgage and two kids in college.").await;

            let attempt = session.request_recommendation().await;
            assert!(matches!(attempt, RecommendationAttempt::Screened(_)));

            let snapshot = session.snapshot().await;
            assert!(snapshot.alerts.is_empty());
            assert_eq!(snapshot.unread_alerts, 0);
            assert_eq!(snapshot.recommendation.as_str(), expected);
        }
    }

    #[tokio::test]
    async fn short_transcript_is_rejected_without_provider_call() {
        let recommendation = Arc::new(ScriptedRecommendation::answering("Consider bonds."));
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            recommendation.clone(),
        );
        session.on_utterance_recognized("Hi there").await;

        let attempt = session.request_recommendation().await;

        assert!(matches!(
            attempt,
            RecommendationAttempt::Rejected(ref failure)
                if failure.reason_code == "transcript_too_short"
        ));
        assert_eq!(recommendation.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.snapshot().await.recommendation.as_str(), "skipped");
    }

    #[tokio::test]
    async fn rejected_transcript_releases_gate_for_next_request() {
        let recommendation = Arc::new(ScriptedRecommendation::answering("Consider bonds."));
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            recommendation.clone(),
        );
        session.on_utterance_recognized("Hi there").await;
        assert!(matches!(
            session.request_recommendation().await,
            RecommendationAttempt::Rejected(_)
        ));

        session.on_utterance_recognized("We have a mortgage and two kids in college.").await;
        let second = session.request_recommendation().await;

        assert!(matches!(
            second,
            RecommendationAttempt::Screened(RecommendationOutcome::Ready { .. })
        ));
        assert_eq!(recommendation.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.snapshot().await.recommendation.as_str(), "ready");
    }

    #[tokio::test(start_paused = true)]
    async fn generation_timeout_fails_attempt_and_releases_gate() {
        let recommendation = Arc::new(ScriptedRecommendation {
            answer: Ok("Consider index funds.".to_string()),
            release: Some(Arc::new(Notify::new())),
            calls: AtomicUsize::new(0),
        });
        let settings = SessionSettings {
            generation_timeout: Duration::from_secs(1),
            ..SessionSettings::default()
        };
        let session = session_with(
            settings,
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            recommendation.clone(),
        );
        session.on_utterance_recognized("We have a mortgage and two kids in college.").await;

        let first = session.request_recommendation().await;
        assert!(matches!(
            first,
            RecommendationAttempt::ProviderFailed { ref user_message }
                if user_message.contains("took too long")
        ));
        assert_eq!(session.snapshot().await.recommendation.as_str(), "failed");

        let second = session.request_recommendation().await;
        assert!(matches!(second, RecommendationAttempt::ProviderFailed { .. }));
        assert_eq!(recommendation.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn provider_failure_resolves_to_failed_state_and_releases_gate() {
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            Arc::new(ScriptedRecommendation::failing("503 from provider")),
        );
        session.on_utterance_recognized("We have a mortgage and two kids in college.").await;

        let first = session.request_recommendation().await;
        assert!(matches!(first, RecommendationAttempt::ProviderFailed { .. }));
        assert_eq!(session.snapshot().await.recommendation.as_str(), "failed");

        let second = session.request_recommendation().await;
        assert!(matches!(second, RecommendationAttempt::ProviderFailed { .. }));
    }

    #[tokio::test]
    async fn in_flight_recommendation_suppresses_second_trigger() {
        let release = Arc::new(Notify::new());
        let recommendation = Arc::new(ScriptedRecommendation {
            answer: Ok("Consider index funds.".to_string()),
            release: Some(release.clone()),
            calls: AtomicUsize::new(0),
        });
        let session = Arc::new(session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            recommendation.clone(),
        ));
        session.on_utterance_recognized("We have a mortgage and two kids in college.").await;

        let background = Arc::clone(&session);
        let first = tokio::spawn(async move { background.request_recommendation().await });
        while recommendation.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(session.snapshot().await.recommendation, RecommendationState::Generating);

        let second = session.request_recommendation().await;
        assert_eq!(second, RecommendationAttempt::Suppressed);

        release.notify_one();
        let first = first.await.expect("first attempt joins");
        assert!(matches!(
            first,
            RecommendationAttempt::Screened(RecommendationOutcome::Ready {
                priority: AlertPriority::Low,
                ..
            })
        ));
        assert_eq!(recommendation.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_flushes_once_and_ignores_later_utterances() {
        let guidance = Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER));
        let recommendation = Arc::new(ScriptedRecommendation::answering("Consider a bond ladder."));
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            guidance.clone(),
            recommendation.clone(),
        );
        session.set_recommendations_enabled(false).await;
        session.on_utterance_recognized("We have a mortgage and two kids in college.").await;

        let attempt = session.stop().await;
        assert!(matches!(attempt, Some(RecommendationAttempt::Screened(_))));
        assert_eq!(recommendation.calls.load(Ordering::SeqCst), 1);
        assert_eq!(guidance.calls.load(Ordering::SeqCst), 1);

        session.on_utterance_recognized("One more thing").await;
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::Stopped);
        assert_eq!(snapshot.transcript_event_count, 1);
        assert_eq!(snapshot.alerts.len(), 1);

        assert!(session.stop().await.is_none());
        assert_eq!(recommendation.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_during_in_flight_generation_reports_suppressed_flush() {
        let release = Arc::new(Notify::new());
        let recommendation = Arc::new(ScriptedRecommendation {
            answer: Ok("Consider index funds.".to_string()),
            release: Some(release.clone()),
            calls: AtomicUsize::new(0),
        });
        let session = Arc::new(session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            recommendation.clone(),
        ));
        session.on_utterance_recognized("We have a mortgage and two kids in college.").await;

        let background = Arc::clone(&session);
        let in_flight = tokio::spawn(async move { background.request_recommendation().await });
        while recommendation.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.stop().await, Some(RecommendationAttempt::Suppressed));

        release.notify_one();
        let in_flight = in_flight.await.expect("in-flight attempt joins");
        assert!(matches!(in_flight, RecommendationAttempt::Screened(_)));
        assert_eq!(recommendation.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.snapshot().await.alerts.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn alert_banner_hides_after_display_delay() {
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            Arc::new(ScriptedRecommendation::answering("Consider index funds.")),
        );
        session.on_utterance_recognized("We have a mortgage and two kids in college.").await;
        session.request_recommendation().await;
        assert!(session.snapshot().await.alert_visible);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(session.snapshot().await.alert_visible);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let snapshot = session.snapshot().await;
        assert!(!snapshot.alert_visible);
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.unread_alerts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_hide_timer_is_not_renewed_by_later_alert() {
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            Arc::new(ScriptedRecommendation::answering("Consider index funds.")),
        );
        session.on_utterance_recognized("We have a mortgage and two kids in college.").await;
        session.request_recommendation().await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        session.request_recommendation().await;
        assert!(session.snapshot().await.alert_visible);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let snapshot = session.snapshot().await;
        assert!(!snapshot.alert_visible);
        assert_eq!(snapshot.alerts.len(), 2);
        assert_eq!(snapshot.unread_alerts, 2);
    }

    #[tokio::test]
    async fn read_transitions_update_unread_count() {
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            Arc::new(ScriptedRecommendation::answering("Consider index funds.")),
        );
        session.on_utterance_recognized("We have a mortgage and two kids in college.").await;
        session.request_recommendation().await;
        session.request_recommendation().await;

        let alerts = session.snapshot().await.alerts;
        assert_eq!(alerts.len(), 2);

        assert!(session.mark_alert_read(&alerts[0].id).await);
        assert!(!session.mark_alert_read(&alerts[0].id).await);
        assert_eq!(session.snapshot().await.unread_alerts, 1);

        session.mark_all_alerts_read().await;
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.unread_alerts, 0);
        assert_eq!(snapshot.alerts.len(), 2);
    }

    #[tokio::test]
    async fn subscribers_observe_latest_snapshot() {
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            Arc::new(ScriptedRecommendation::answering("Consider index funds.")),
        );
        let mut updates = session.subscribe();

        session.on_utterance_recognized("We are happy with our progress").await;

        assert!(updates.has_changed().expect("sender alive"));
        let latest = updates.borrow_and_update().clone();
        assert_eq!(latest.transcript_event_count, 1);
        assert_eq!(
            latest.current_sentiment.map(|sentiment| sentiment.score.label),
            Some(SentimentLabel::Positive)
        );
    }

    #[tokio::test]
    async fn snapshot_serializes_for_view_layer() {
        let session = session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            Arc::new(ScriptedRecommendation::answering("Consider index funds.")),
        );
        session.on_utterance_recognized("We are happy with our progress").await;

        let json = serde_json::to_value(session.snapshot().await).expect("snapshot serializes");
        assert_eq!(json["session_id"], "session-test");
        assert_eq!(json["phase"], "listening");
        assert_eq!(json["recommendation"]["state"], "idle");
        assert_eq!(json["rolling_sentiment"]["overall"]["label"], "positive");
        assert_eq!(json["last_utterance"]["sequence_number"], 1);
    }

    #[tokio::test]
    async fn transcript_cap_evicts_oldest_lines_without_touching_count() {
        let settings =
            SessionSettings { max_transcript_chars: Some(40), ..SessionSettings::default() };
        let session = session_with(
            settings,
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            Arc::new(ScriptedRecommendation::answering("Consider index funds.")),
        );

        session.on_utterance_recognized("First line about savings").await;
        session.on_utterance_recognized("Second line about pensions").await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.transcript, "Second line about pensions");
        assert_eq!(snapshot.transcript_event_count, 2);
    }

    #[tokio::test]
    async fn spawned_utterance_runs_pipeline() {
        let session = Arc::new(session_with(
            SessionSettings::default(),
            lexicon(),
            Arc::new(ScriptedGuidance::always(GUIDANCE_ANSWER)),
            Arc::new(ScriptedRecommendation::answering("Consider index funds.")),
        ));

        session.spawn_utterance("We own our home outright").await.expect("handler joins");

        assert_eq!(session.snapshot().await.transcript_event_count, 1);
    }
}
