use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use teller_core::domain::{
    AccountIntent, BasicIntent, Category, Classification, ClassificationSource, RequestKind,
    TaskIntent,
};
use teller_core::errors::ClassifierError;
use tracing::{debug, warn};

use crate::llm::LlmClient;

pub const FALLBACK_CONFIDENCE: f64 = 0.7;

const TASK_KEYWORDS: [&str; 5] = ["loan", "block", "card", "apply", "application"];
const ACCOUNT_KEYWORDS: [&str; 5] = ["balance", "transaction", "history", "statement", "account"];

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, utterance: &str) -> Result<Classification, ClassifierError>;
}

/// Deterministic keyword rules. Always succeeds.
#[derive(Clone, Debug, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_text(&self, utterance: &str) -> Classification {
        let lowered = utterance.to_lowercase();
        let has = |keyword: &str| lowered.contains(keyword);

        let kind = if TASK_KEYWORDS.iter().any(|keyword| has(keyword)) {
            RequestKind::SpecificTask(if has("loan") {
                TaskIntent::LoanApplication
            } else if has("block") && has("card") {
                TaskIntent::CardBlocking
            } else {
                TaskIntent::GeneralTask
            })
        } else if ACCOUNT_KEYWORDS.iter().any(|keyword| has(keyword)) {
            RequestKind::AccountQuery(if has("balance") {
                AccountIntent::BalanceInquiry
            } else if has("transaction") || has("history") {
                AccountIntent::TransactionHistory
            } else {
                AccountIntent::AccountDetails
            })
        } else {
            RequestKind::BasicQuery(BasicIntent::GeneralInquiry)
        };

        Classification::new(kind, FALLBACK_CONFIDENCE, ClassificationSource::Fallback)
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, utterance: &str) -> Result<Classification, ClassifierError> {
        Ok(self.classify_text(utterance))
    }
}

/// Asks a generative model for a structured classification and parses it out of
/// whatever free text comes back.
pub struct ModelClassifier<C> {
    client: C,
}

impl<C> ModelClassifier<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> IntentClassifier for ModelClassifier<C>
where
    C: LlmClient,
{
    async fn classify(&self, utterance: &str) -> Result<Classification, ClassifierError> {
        let completion = self
            .client
            .complete(&classification_prompt(utterance))
            .await
            .map_err(|error| ClassifierError::Unavailable(format!("{error:#}")))?;

        parse_classification(&completion)
    }
}

pub fn classification_prompt(utterance: &str) -> String {
    let quoted = serde_json::to_string(utterance).unwrap_or_else(|_| format!("\"{utterance}\""));
    format!(
        "Analyze this banking customer query and classify it into one of these categories:\n\
         1. BASIC_QUERY - General questions about services, rates, charges\n\
         2. ACCOUNT_QUERY - Balance inquiry, transaction history, account details\n\
         3. SPECIFIC_TASK - Loan application, card blocking, specific actions\n\
         \n\
         User Query: {quoted}\n\
         \n\
         Return a JSON object with:\n\
         - category: one of the three categories above\n\
         - intent: specific intent (balance_inquiry, transaction_history, account_details, \
         loan_application, card_blocking, general_inquiry)\n\
         - entities: any account numbers, amounts, or specific details mentioned\n\
         - confidence: confidence score 0-1\n\
         \n\
         JSON Response:"
    )
}

/// Parses the first balanced JSON object in `text`.
///
/// A payload naming no known category is coerced to a general inquiry instead
/// of being rejected.
pub fn parse_classification(text: &str) -> Result<Classification, ClassifierError> {
    let block = first_json_object(text).ok_or_else(|| {
        ClassifierError::MalformedPayload("no json object in response".to_string())
    })?;
    let payload: Map<String, Value> = serde_json::from_str(block)
        .map_err(|error| ClassifierError::MalformedPayload(error.to_string()))?;

    let confidence = payload.get("confidence").and_then(number_like).unwrap_or(0.0);
    let category = payload.get("category").and_then(Value::as_str).and_then(Category::from_label);
    let intent = payload.get("intent").and_then(Value::as_str).unwrap_or_default();

    let mut classification = match category {
        Some(category) => Classification::new(
            RequestKind::from_labels(category, intent),
            confidence,
            ClassificationSource::Model,
        ),
        None => {
            debug!(
                event_name = "classifier.payload_coerced",
                category = ?payload.get("category"),
                "unrecognised category coerced to general inquiry"
            );
            Classification::new(
                RequestKind::general_inquiry(),
                confidence,
                ClassificationSource::Coerced,
            )
        }
    };

    if let Some(Value::Object(entities)) = payload.get("entities") {
        for (key, value) in entities {
            let rendered = match value {
                Value::Null => continue,
                Value::String(text) if text.trim().is_empty() => continue,
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            classification.entities.insert(key.clone(), rendered);
        }
    }

    Ok(classification)
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Locates the first `{...}` block whose braces balance, skipping braces inside
/// string literals.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Tries the primary classifier under a deadline and falls back to keyword
/// rules on any failure. Never fails.
#[derive(Clone)]
pub struct ResilientClassifier {
    primary: Option<Arc<dyn IntentClassifier>>,
    fallback: KeywordClassifier,
    timeout: Duration,
}

impl ResilientClassifier {
    pub fn new(primary: Arc<dyn IntentClassifier>, timeout: Duration) -> Self {
        Self { primary: Some(primary), fallback: KeywordClassifier, timeout }
    }

    pub fn offline() -> Self {
        Self { primary: None, fallback: KeywordClassifier, timeout: Duration::from_secs(10) }
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub async fn classify(&self, utterance: &str) -> Classification {
        let Some(primary) = &self.primary else {
            return self.fallback.classify_text(utterance);
        };

        let error = match tokio::time::timeout(self.timeout, primary.classify(utterance)).await {
            Ok(Ok(classification)) => return classification,
            Ok(Err(error)) => error,
            Err(_) => ClassifierError::Timeout(self.timeout),
        };

        warn!(
            event_name = "classifier.fallback_engaged",
            error = %error,
            "primary classifier failed; using keyword rules"
        );
        self.fallback.classify_text(utterance)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use teller_core::domain::{
        AccountIntent, Category, ClassificationSource, RequestKind, TaskIntent,
    };
    use teller_core::errors::ClassifierError;

    use super::{
        classification_prompt, parse_classification, IntentClassifier, KeywordClassifier,
        ModelClassifier, ResilientClassifier, FALLBACK_CONFIDENCE,
    };
    use crate::llm::LlmClient;

    struct CannedClient {
        reply: Result<String, String>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl CannedClient {
        fn replying(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), delay: Duration::ZERO, calls: AtomicUsize::new(0) }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.reply.clone().map_err(|message| anyhow!(message))
        }
    }

    fn resilient(client: CannedClient, timeout: Duration) -> ResilientClassifier {
        ResilientClassifier::new(Arc::new(ModelClassifier::new(client)), timeout)
    }

    #[test]
    fn keyword_rules_follow_task_then_account_precedence() {
        let rules = KeywordClassifier::new();
        let cases = [
            ("I want a home loan", RequestKind::SpecificTask(TaskIntent::LoanApplication)),
            ("block my card", RequestKind::SpecificTask(TaskIntent::CardBlocking)),
            ("please block it", RequestKind::SpecificTask(TaskIntent::GeneralTask)),
            ("loan balance for account", RequestKind::SpecificTask(TaskIntent::LoanApplication)),
            ("What's my balance?", RequestKind::AccountQuery(AccountIntent::BalanceInquiry)),
            ("recent transactions", RequestKind::AccountQuery(AccountIntent::TransactionHistory)),
            ("show me my history", RequestKind::AccountQuery(AccountIntent::TransactionHistory)),
            ("mail me a statement", RequestKind::AccountQuery(AccountIntent::AccountDetails)),
            ("What are your interest rates?", RequestKind::general_inquiry()),
            ("", RequestKind::general_inquiry()),
        ];

        for (utterance, expected) in cases {
            let classification = rules.classify_text(utterance);
            assert_eq!(classification.kind, expected, "utterance: {utterance}");
            assert_eq!(classification.confidence, FALLBACK_CONFIDENCE);
            assert!(classification.entities.is_empty());
            assert_eq!(classification.source, ClassificationSource::Fallback);
        }
    }

    #[test]
    fn payload_is_found_inside_free_text() {
        let text = r#"Sure! Here is the result:
```json
{"category": "ACCOUNT_QUERY", "intent": "balance_inquiry",
 "entities": {"account_number": "12345678", "note": "uses {braces}", "amount": 500, "empty": null},
 "confidence": 0.92}
```
Let me know {if} you need more."#;

        let classification = match parse_classification(text) {
            Ok(classification) => classification,
            Err(error) => panic!("payload should parse: {error}"),
        };

        assert_eq!(classification.kind, RequestKind::AccountQuery(AccountIntent::BalanceInquiry));
        assert_eq!(classification.confidence, 0.92);
        assert_eq!(classification.source, ClassificationSource::Model);
        let entity = |key: &str| classification.entities.get(key).cloned();
        assert_eq!(entity("account_number").as_deref(), Some("12345678"));
        assert_eq!(entity("note").as_deref(), Some("uses {braces}"));
        assert_eq!(entity("amount").as_deref(), Some("500"));
        assert!(!classification.entities.contains_key("empty"));
    }

    #[test]
    fn unknown_category_is_coerced_not_rejected() {
        let payload = r#"{"category": "SMALL_TALK", "intent": "greeting", "confidence": "0.4"}"#;
        let classification = match parse_classification(payload) {
            Ok(classification) => classification,
            Err(error) => panic!("payload should parse: {error}"),
        };

        assert_eq!(classification.category(), Category::BasicQuery);
        assert_eq!(classification.intent_name(), "general_inquiry");
        assert_eq!(classification.source, ClassificationSource::Coerced);
        assert_eq!(classification.confidence, 0.4);
    }

    #[test]
    fn confidence_is_clamped_and_defaults_to_zero() {
        let high = parse_classification(
            r#"{"category":"BASIC_QUERY","intent":"general_inquiry","confidence":7}"#,
        );
        assert_eq!(high.map(|c| c.confidence), Ok(1.0));

        let missing =
            parse_classification(r#"{"category":"specific task","intent":"card blocking"}"#);
        let missing = match missing {
            Ok(classification) => classification,
            Err(error) => panic!("payload should parse: {error}"),
        };
        assert_eq!(missing.confidence, 0.0);
        assert_eq!(missing.kind, RequestKind::SpecificTask(TaskIntent::CardBlocking));
    }

    #[test]
    fn text_without_a_balanced_object_is_malformed() {
        let texts = [
            "I think it's a balance query",
            r#"{"category": "BASIC_QUERY""#,
            "{category: BASIC_QUERY}",
        ];
        for text in texts {
            assert!(
                matches!(parse_classification(text), Err(ClassifierError::MalformedPayload(_))),
                "text: {text}"
            );
        }
    }

    #[test]
    fn prompt_quotes_the_utterance() {
        let prompt = classification_prompt(r#"say "hi""#);
        assert!(prompt.contains(r#"User Query: "say \"hi\"""#));
        assert!(prompt.contains("SPECIFIC_TASK"));
    }

    #[tokio::test]
    async fn model_classification_is_used_when_available() {
        let classifier = resilient(
            CannedClient::replying(
                r#"{"category":"SPECIFIC_TASK","intent":"loan_application","entities":{},"confidence":0.95}"#,
            ),
            Duration::from_secs(1),
        );

        let classification = classifier.classify("what is my balance").await;
        assert_eq!(classification.kind, RequestKind::SpecificTask(TaskIntent::LoanApplication));
        assert_eq!(classification.source, ClassificationSource::Model);
    }

    #[tokio::test]
    async fn client_errors_fall_back_to_keyword_rules() {
        let classifier =
            resilient(CannedClient::failing("connection refused"), Duration::from_secs(1));

        let classification = classifier.classify("block my credit card").await;
        assert_eq!(classification.kind, RequestKind::SpecificTask(TaskIntent::CardBlocking));
        assert_eq!(classification.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(classification.source, ClassificationSource::Fallback);
    }

    #[tokio::test]
    async fn malformed_payload_falls_back() {
        let classifier =
            resilient(CannedClient::replying("no idea, sorry"), Duration::from_secs(1));

        let classification = classifier.classify("transaction history please").await;
        assert_eq!(
            classification.kind,
            RequestKind::AccountQuery(AccountIntent::TransactionHistory)
        );
        assert_eq!(classification.source, ClassificationSource::Fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_times_out_into_fallback() {
        let client = CannedClient {
            delay: Duration::from_secs(30),
            ..CannedClient::replying(
                r#"{"category":"BASIC_QUERY","intent":"general_inquiry","confidence":1}"#,
            )
        };
        let classifier = resilient(client, Duration::from_millis(50));

        let classification = classifier.classify("what's my balance").await;
        assert_eq!(classification.kind, RequestKind::AccountQuery(AccountIntent::BalanceInquiry));
        assert_eq!(classification.source, ClassificationSource::Fallback);
    }

    #[tokio::test]
    async fn offline_classifier_never_calls_out() {
        let classifier = ResilientClassifier::offline();
        assert!(!classifier.has_primary());

        let classification = classifier.classify("apply for a car loan").await;
        assert_eq!(classification.kind, RequestKind::SpecificTask(TaskIntent::LoanApplication));

        let direct = KeywordClassifier::new().classify("apply for a car loan").await;
        assert_eq!(direct, Ok(classification));
    }
}
