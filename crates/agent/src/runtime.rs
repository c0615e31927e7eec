use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use teller_core::backend::BankingBackend;
use teller_core::config::AppConfig;
use teller_core::dialogue::{
    ActionDispatcher, DialogueState, DispatchSettings, DispatchState, NextAction, Reasoner,
    SlotRequirements,
};
use teller_core::errors::TurnError;
use teller_core::interaction::{InteractionSink, TurnRecord};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::classifier::{ModelClassifier, ResilientClassifier};
use crate::extractor::EntityExtractor;
use crate::guardrails::{ConfidencePolicy, GuardrailDecision};
use crate::llm::HttpLlmClient;

/// Shared, read-only wiring that every session is opened from.
#[derive(Clone)]
pub struct DialogueRuntime {
    classifier: ResilientClassifier,
    backend: Arc<dyn BankingBackend>,
    sink: Arc<dyn InteractionSink>,
    settings: DispatchSettings,
    requirements: SlotRequirements,
    policy: ConfidencePolicy,
}

impl DialogueRuntime {
    pub fn new(
        classifier: ResilientClassifier,
        backend: Arc<dyn BankingBackend>,
        sink: Arc<dyn InteractionSink>,
    ) -> Self {
        Self {
            classifier,
            backend,
            sink,
            settings: DispatchSettings::default(),
            requirements: SlotRequirements::default(),
            policy: ConfidencePolicy::default(),
        }
    }

    /// Wires the model classifier when `[llm]` is enabled, keyword rules otherwise.
    pub fn from_config(
        config: &AppConfig,
        backend: Arc<dyn BankingBackend>,
        sink: Arc<dyn InteractionSink>,
    ) -> Result<Self> {
        let classifier = if config.llm.enabled {
            let client = HttpLlmClient::from_config(&config.llm)?;
            info!(
                event_name = "runtime.classifier.model",
                provider = config.llm.provider.as_str(),
                model = %config.llm.model,
                "model classifier enabled with keyword fallback"
            );
            ResilientClassifier::new(
                Arc::new(ModelClassifier::new(client)),
                Duration::from_secs(config.llm.timeout_secs),
            )
        } else {
            info!(event_name = "runtime.classifier.offline", "keyword classifier only");
            ResilientClassifier::offline()
        };

        Ok(Self::new(classifier, backend, sink)
            .with_settings(DispatchSettings {
                history_days: config.dialogue.history_days,
                max_transactions_shown: config.dialogue.max_transactions_shown,
            })
            .with_policy(ConfidencePolicy::new(config.dialogue.min_confidence)))
    }

    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_requirements(mut self, requirements: SlotRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_policy(mut self, policy: ConfidencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn classifier(&self) -> &ResilientClassifier {
        &self.classifier
    }

    pub fn open_session(&self) -> DialogueSession {
        self.open_session_with_id(Uuid::new_v4().to_string())
    }

    pub fn open_session_with_id(&self, session_id: impl Into<String>) -> DialogueSession {
        self.resume_session(session_id, DialogueState::new())
    }

    /// Reattaches previously gathered slots, e.g. after a handoff between workers.
    pub fn resume_session(
        &self,
        session_id: impl Into<String>,
        state: DialogueState,
    ) -> DialogueSession {
        DialogueSession {
            session_id: session_id.into(),
            state,
            extractor: EntityExtractor::new(),
            classifier: self.classifier.clone(),
            reasoner: Reasoner::new(self.requirements.clone()),
            dispatcher: ActionDispatcher::new(self.backend.clone(), self.settings),
            policy: self.policy.clone(),
            sink: self.sink.clone(),
        }
    }
}

/// One conversation. Owns its dialogue state exclusively; callers serialize
/// turns through `&mut self`.
pub struct DialogueSession {
    session_id: String,
    state: DialogueState,
    extractor: EntityExtractor,
    classifier: ResilientClassifier,
    reasoner: Reasoner,
    dispatcher: ActionDispatcher,
    policy: ConfidencePolicy,
    sink: Arc<dyn InteractionSink>,
}

impl DialogueSession {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> &DialogueState {
        &self.state
    }

    /// Clears gathered slots. The interaction log is untouched.
    pub fn reset(&mut self) {
        self.state.reset();
        info!(event_name = "dialogue.session.reset", session_id = %self.session_id);
    }

    /// Runs one turn and always produces a reply.
    pub async fn chat(&mut self, utterance: &str) -> String {
        if utterance.trim().is_empty() {
            debug!(event_name = "dialogue.turn.empty_input", session_id = %self.session_id);
            return TurnError::UnrecoverableInput.user_message().to_string();
        }

        let span = info_span!("dialogue.turn", session_id = %self.session_id);
        self.run_turn(utterance).instrument(span).await
    }

    async fn run_turn(&mut self, utterance: &str) -> String {
        let changed = self.extractor.extract_into(utterance, &mut self.state);
        if !changed.is_empty() {
            debug!(event_name = "dialogue.slots.extracted", slots = ?changed);
        }

        let classification = self.classifier.classify(utterance).await;

        let (next_action, dispatch_state, response) = match self.policy.evaluate(&classification) {
            GuardrailDecision::Clarify { reason_code, user_message } => {
                info!(
                    event_name = "dialogue.turn.clarify",
                    reason_code,
                    confidence = classification.confidence
                );
                (NextAction::GatherInfo, DispatchState::Gathering, user_message)
            }
            GuardrailDecision::Allow => {
                let reasoning = self.reasoner.reason(&classification, &self.state);
                let outcome = self
                    .dispatcher
                    .dispatch(utterance, &classification, &reasoning, &self.state)
                    .await;
                (reasoning.next_action, outcome.state, outcome.response)
            }
        };

        info!(
            event_name = "dialogue.turn.completed",
            category = %classification.category(),
            intent = classification.intent_name(),
            source = ?classification.source,
            confidence = classification.confidence,
            next_action = ?next_action,
            dispatch_state = ?dispatch_state
        );

        self.sink.record(TurnRecord::new(
            self.session_id.clone(),
            utterance,
            classification,
            next_action,
            dispatch_state,
            response.clone(),
            self.state.snapshot(),
        ));

        response
    }
}
