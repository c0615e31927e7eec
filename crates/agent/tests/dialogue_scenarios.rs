use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use regex::Regex;
use rust_decimal::Decimal;
use teller_agent::classifier::{KeywordClassifier, ModelClassifier, ResilientClassifier};
use teller_agent::guardrails::{ConfidencePolicy, CLARIFICATION_PROMPT};
use teller_agent::llm::LlmClient;
use teller_agent::runtime::{DialogueRuntime, DialogueSession};
use teller_agent::sessions::SessionRegistry;
use teller_core::backend::{BankingBackend, InMemoryBankingBackend};
use teller_core::dialogue::{DialogueState, DispatchState, NextAction};
use teller_core::domain::{
    Account, CardType, ClassificationSource, FeeEntry, InterestRate, LoanDecision, Slot,
    Transaction,
};
use teller_core::errors::BackendError;
use teller_core::interaction::InMemoryInteractionLog;

const ACCOUNT_PROMPT: &str = "Could you please provide your 8-digit account number?";

#[derive(Default)]
struct RecordingBackend {
    inner: InMemoryBankingBackend,
    calls: Mutex<Vec<String>>,
}

impl RecordingBackend {
    fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, call: String) {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
    }
}

#[async_trait]
impl BankingBackend for RecordingBackend {
    async fn get_account_details(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, BackendError> {
        self.push(format!("get_account_details({account_number})"));
        self.inner.get_account_details(account_number).await
    }

    async fn get_transaction_history(
        &self,
        account_number: &str,
        days: u32,
    ) -> Result<Vec<Transaction>, BackendError> {
        self.push(format!("get_transaction_history({account_number},{days})"));
        self.inner.get_transaction_history(account_number, days).await
    }

    async fn check_credit_score(&self, account_number: &str) -> Result<u16, BackendError> {
        self.push(format!("check_credit_score({account_number})"));
        self.inner.check_credit_score(account_number).await
    }

    async fn block_card(
        &self,
        account_number: &str,
        card_type: CardType,
    ) -> Result<bool, BackendError> {
        self.push(format!("block_card({account_number},{card_type})"));
        self.inner.block_card(account_number, card_type).await
    }

    async fn apply_loan(
        &self,
        account_number: &str,
        loan_type: &str,
        amount: Decimal,
    ) -> Result<LoanDecision, BackendError> {
        self.push(format!("apply_loan({account_number},{loan_type},{amount})"));
        self.inner.apply_loan(account_number, loan_type, amount).await
    }

    fn interest_rates(&self) -> Vec<InterestRate> {
        self.inner.interest_rates()
    }

    fn fee_schedule(&self) -> Vec<FeeEntry> {
        self.inner.fee_schedule()
    }
}

/// Generative stand-in: fixed reply, optional delay, or failure.
struct ScriptedModel {
    reply: Result<String, String>,
    delay: Duration,
}

impl ScriptedModel {
    fn replying(text: &str) -> Self {
        Self { reply: Ok(text.to_string()), delay: Duration::ZERO }
    }

    fn failing(message: &str) -> Self {
        Self { reply: Err(message.to_string()), delay: Duration::ZERO }
    }
}

#[async_trait]
impl LlmClient for ScriptedModel {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().map_err(|message| anyhow!(message))
    }
}

struct Harness {
    backend: Arc<RecordingBackend>,
    log: InMemoryInteractionLog,
    runtime: DialogueRuntime,
}

impl Harness {
    fn offline() -> Self {
        Self::with_classifier(ResilientClassifier::offline())
    }

    fn with_model(model: ScriptedModel, timeout: Duration) -> Self {
        let classifier = ResilientClassifier::new(Arc::new(ModelClassifier::new(model)), timeout);
        Self::with_classifier(classifier)
    }

    fn with_classifier(classifier: ResilientClassifier) -> Self {
        let backend = Arc::new(RecordingBackend::default());
        let log = InMemoryInteractionLog::default();
        let runtime = DialogueRuntime::new(classifier, backend.clone(), Arc::new(log.clone()));
        Self { backend, log, runtime }
    }

    fn session(&self) -> DialogueSession {
        self.runtime.open_session_with_id("scenario")
    }
}

#[tokio::test]
async fn balance_without_account_asks_for_it() {
    let harness = Harness::offline();
    let mut session = harness.session();

    let reply = session.chat("What's my balance?").await;

    assert!(reply.contains(ACCOUNT_PROMPT), "reply was: {reply}");
    assert!(session.state().is_empty());
    assert!(harness.backend.calls().is_empty());
}

#[tokio::test]
async fn balance_with_account_number_renders_balance() {
    let harness = Harness::offline();
    let mut session = harness.session();

    let reply = session.chat("My account is 12345678, what's my balance?").await;

    assert_eq!(session.state().get(Slot::AccountNumber), Some("12345678"));
    assert_eq!(harness.backend.calls(), vec!["get_account_details(12345678)".to_string()]);
    assert!(reply.contains("Hello John Doe!"));
    assert!(reply.contains("₹15,000.50"));

    let records = harness.log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].classification.intent_name(), "balance_inquiry");
    assert_eq!(records[0].dispatch_state, DispatchState::AccountResponse);
}

#[tokio::test]
async fn home_loan_in_one_utterance_is_submitted() {
    let harness = Harness::offline();
    let mut session = harness.session();

    let reply = session.chat("I want a home loan of 500000 for account 87654321").await;

    assert_eq!(session.state().get(Slot::AccountNumber), Some("87654321"));
    assert_eq!(session.state().get(Slot::LoanType), Some("Home Loan"));
    assert_eq!(session.state().get(Slot::LoanAmount), Some("500000"));
    assert_eq!(
        harness.backend.calls(),
        vec![
            "apply_loan(87654321,Home Loan,500000)".to_string(),
            "check_credit_score(87654321)".to_string()
        ]
    );
    assert!(reply.contains("Status: Under Review"));
    assert_eq!(harness.log.records()[0].next_action, NextAction::Execute);
}

#[tokio::test]
async fn credit_card_block_is_confirmed_with_timestamp() {
    let harness = Harness::offline();
    let mut session = harness.session();

    let reply = session.chat("block my credit card, account 12345678").await;

    assert_eq!(session.state().get(Slot::CardType), Some("credit"));
    assert_eq!(session.state().get(Slot::AccountNumber), Some("12345678"));
    assert_eq!(harness.backend.calls(), vec!["block_card(12345678,credit)".to_string()]);
    assert!(reply.contains("BLOCKED"));

    let timestamp =
        Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} UTC").map_err(|err| err.to_string());
    assert_eq!(timestamp.map(|pattern| pattern.is_match(&reply)), Ok(true));
    assert!(harness.backend.inner.is_card_blocked("12345678", CardType::Credit));
}

#[tokio::test]
async fn malformed_loan_amount_makes_no_backend_calls() {
    let harness = Harness::offline();
    let mut state = DialogueState::new();
    state.set(Slot::AccountNumber, "12345678");
    state.set(Slot::LoanType, "Personal Loan");
    state.set(Slot::LoanAmount, "abc");
    let mut session = harness.runtime.resume_session("scenario", state);

    let reply = session.chat("please go ahead with the loan").await;

    assert_eq!(reply, "Please provide a valid loan amount in numbers.");
    assert!(harness.backend.calls().is_empty());
    assert_eq!(session.state().get(Slot::LoanAmount), Some("abc"));
    assert_eq!(session.state().get(Slot::LoanType), Some("Personal Loan"));
}

#[tokio::test]
async fn loan_details_are_gathered_over_several_turns() {
    let harness = Harness::offline();
    let mut session = harness.session();

    let first = session.chat("I'd like a loan").await;
    assert!(first.contains(ACCOUNT_PROMPT));

    let second = session.chat("loan for account 12345678").await;
    assert!(second.contains("What type of loan"));

    let third = session.chat("a car loan please").await;
    assert!(third.contains("What loan amount"));
    assert!(harness.backend.calls().is_empty());

    let fourth = session.chat("make the loan 2,50,000").await;
    assert!(fourth.contains("Status: Approved"));
    assert_eq!(
        harness.backend.calls(),
        vec![
            "apply_loan(12345678,Car Loan,250000)".to_string(),
            "check_credit_score(12345678)".to_string()
        ]
    );
}

#[tokio::test]
async fn slots_survive_every_turn_until_reset() {
    let harness = Harness::offline();
    let mut session = harness.session();
    let turns = [
        "account 12345678",
        "what are your interest rates?",
        "home loan",
        "",
        "any fees?",
        "actually make it a personal loan of 75000",
        "hello",
    ];

    let mut seen: Vec<Slot> = Vec::new();
    for turn in turns {
        session.chat(turn).await;
        for slot in &seen {
            assert!(session.state().contains(*slot), "{slot} was cleared by `{turn}`");
        }
        seen = session.state().iter().map(|(slot, _)| slot).collect();
    }
    assert_eq!(session.state().get(Slot::LoanType), Some("Personal Loan"));

    let turns_logged = harness.log.len();
    session.reset();
    assert!(session.state().is_empty());
    assert_eq!(harness.log.len(), turns_logged);
}

#[tokio::test]
async fn unknown_account_is_reported_and_state_kept() {
    let harness = Harness::offline();
    let mut session = harness.session();

    let reply = session.chat("balance for 99990000").await;

    assert!(reply.contains("couldn't find an account"));
    assert_eq!(session.state().get(Slot::AccountNumber), Some("99990000"));
    assert_eq!(harness.backend.calls().len(), 1);
}

#[tokio::test]
async fn account_lookups_are_idempotent() {
    let backend = InMemoryBankingBackend::seeded();
    let first = backend.get_account_details("87654321").await;
    let second = backend.get_account_details("87654321").await;
    assert_eq!(first, second);
    assert!(matches!(first, Ok(Some(_))));
}

#[tokio::test]
async fn failing_model_matches_keyword_rules_exactly() {
    let failing = ResilientClassifier::new(
        Arc::new(ModelClassifier::new(ScriptedModel::failing("503"))),
        Duration::from_secs(1),
    );
    let rules = KeywordClassifier::new();

    for utterance in [
        "What's my balance?",
        "block my debit card",
        "apply now",
        "show my statement",
        "transaction list",
        "what are the charges",
        "I want a personal loan",
    ] {
        let classification = failing.classify(utterance).await;
        assert_eq!(classification, rules.classify_text(utterance), "utterance: {utterance}");
        assert_eq!(classification.confidence, 0.7);
        assert!(classification.entities.is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn hung_model_does_not_block_the_turn() {
    let harness = Harness::with_model(
        ScriptedModel { reply: Ok("{}".to_string()), delay: Duration::from_secs(120) },
        Duration::from_secs(2),
    );
    let mut session = harness.session();

    let reply = session.chat("My account is 12345678, what's my balance?").await;

    assert!(reply.contains("Hello John Doe!"));
    assert_eq!(harness.log.records()[0].classification.source, ClassificationSource::Fallback);
}

#[tokio::test]
async fn model_payload_drives_the_turn() {
    let harness = Harness::with_model(
        ScriptedModel::replying(
            r#"Classification: {"category": "ACCOUNT_QUERY", "intent": "transaction_history", "entities": {"account_number": "12345678"}, "confidence": 0.88}"#,
        ),
        Duration::from_secs(2),
    );
    let mut session = harness.session();

    let reply = session.chat("what did I spend lately on 12345678").await;

    assert!(reply.contains("Here are your recent transactions for account 12345678"));
    assert_eq!(
        harness.backend.calls(),
        vec![
            "get_account_details(12345678)".to_string(),
            "get_transaction_history(12345678,30)".to_string()
        ]
    );
    let record = &harness.log.records()[0];
    assert_eq!(record.classification.source, ClassificationSource::Model);
    assert_eq!(
        record.classification.entities.get("account_number").map(String::as_str),
        Some("12345678")
    );
}

#[tokio::test]
async fn coerced_category_falls_through_to_generic_prompt() {
    let harness = Harness::with_model(
        ScriptedModel::replying(
            r#"{"category": "CHITCHAT", "intent": "greeting", "confidence": 0.9}"#,
        ),
        Duration::from_secs(2),
    );
    let mut session = harness.session();

    let reply = session.chat("hey, what are your rates?").await;

    assert!(reply.contains("Could you please tell me what you'd like to do today?"));
    assert_eq!(harness.log.records()[0].dispatch_state, DispatchState::Fallthrough);
    assert!(harness.backend.calls().is_empty());
}

#[tokio::test]
async fn low_confidence_is_gated_only_when_configured() {
    let low_confidence = || {
        ScriptedModel::replying(
            r#"{"category": "SPECIFIC_TASK", "intent": "card_blocking", "confidence": 0.2}"#,
        )
    };

    let gated = Harness::with_model(low_confidence(), Duration::from_secs(2));
    let runtime = gated.runtime.clone().with_policy(ConfidencePolicy::new(Some(0.5)));
    let mut session = runtime.open_session();
    let reply = session.chat("block card 12345678").await;
    assert_eq!(reply, CLARIFICATION_PROMPT);
    assert!(gated.backend.calls().is_empty());
    assert_eq!(session.state().get(Slot::AccountNumber), Some("12345678"));

    let informational = Harness::with_model(low_confidence(), Duration::from_secs(2));
    let mut session = informational.session();
    let reply = session.chat("block card 12345678").await;
    assert!(reply.contains("Your debit card has been successfully blocked"));
    assert_eq!(informational.backend.calls(), vec!["block_card(12345678,debit)".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_sessions_do_not_share_slots() {
    let harness = Harness::offline();
    let registry = Arc::new(SessionRegistry::new(harness.runtime.clone()));
    assert!(registry.open_with_id("alice"));
    assert!(registry.open_with_id("bob"));

    let alice = {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry.chat("alice", "account 12345678").await;
            registry.chat("alice", "what's my balance").await
        })
    };
    let bob = {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry.chat("bob", "account 87654321").await;
            registry.chat("bob", "what's my balance").await
        })
    };

    let (alice, bob) = match tokio::try_join!(alice, bob) {
        Ok(replies) => replies,
        Err(error) => panic!("session task failed: {error}"),
    };

    assert!(alice.is_some_and(|reply| reply.contains("Hello John Doe!")));
    assert!(bob.is_some_and(|reply| reply.contains("Hello Jane Smith!")));
    assert_eq!(harness.log.records_for("alice").len(), 2);
    assert_eq!(harness.log.records_for("bob").len(), 2);
}
