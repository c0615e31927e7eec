use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse grouping of intents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    BasicQuery,
    AccountQuery,
    SpecificTask,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BasicQuery => "BASIC_QUERY",
            Self::AccountQuery => "ACCOUNT_QUERY",
            Self::SpecificTask => "SPECIFIC_TASK",
        }
    }

    /// Lenient label parsing for classifier output (`account query`, `Account_Query`, ...).
    pub fn from_label(label: &str) -> Option<Self> {
        match normalize_label(label).as_str() {
            "basic_query" => Some(Self::BasicQuery),
            "account_query" => Some(Self::AccountQuery),
            "specific_task" => Some(Self::SpecificTask),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BasicIntent {
    GeneralInquiry,
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountIntent {
    BalanceInquiry,
    TransactionHistory,
    AccountDetails,
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskIntent {
    LoanApplication,
    CardBlocking,
    GeneralTask,
    Other(String),
}

/// Category and intent as one tagged value, so handlers match exhaustively
/// instead of comparing strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestKind {
    BasicQuery(BasicIntent),
    AccountQuery(AccountIntent),
    SpecificTask(TaskIntent),
}

impl RequestKind {
    pub fn general_inquiry() -> Self {
        Self::BasicQuery(BasicIntent::GeneralInquiry)
    }

    pub fn from_labels(category: Category, intent: &str) -> Self {
        let intent = normalize_label(intent);
        match category {
            Category::BasicQuery => Self::BasicQuery(match intent.as_str() {
                "general_inquiry" | "" => BasicIntent::GeneralInquiry,
                _ => BasicIntent::Other(intent),
            }),
            Category::AccountQuery => Self::AccountQuery(match intent.as_str() {
                "balance_inquiry" => AccountIntent::BalanceInquiry,
                "transaction_history" => AccountIntent::TransactionHistory,
                "account_details" => AccountIntent::AccountDetails,
                _ => AccountIntent::Other(intent),
            }),
            Category::SpecificTask => Self::SpecificTask(match intent.as_str() {
                "loan_application" => TaskIntent::LoanApplication,
                "card_blocking" => TaskIntent::CardBlocking,
                "general_task" => TaskIntent::GeneralTask,
                _ => TaskIntent::Other(intent),
            }),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::BasicQuery(_) => Category::BasicQuery,
            Self::AccountQuery(_) => Category::AccountQuery,
            Self::SpecificTask(_) => Category::SpecificTask,
        }
    }

    pub fn intent_name(&self) -> &str {
        match self {
            Self::BasicQuery(BasicIntent::GeneralInquiry) => "general_inquiry",
            Self::AccountQuery(AccountIntent::BalanceInquiry) => "balance_inquiry",
            Self::AccountQuery(AccountIntent::TransactionHistory) => "transaction_history",
            Self::AccountQuery(AccountIntent::AccountDetails) => "account_details",
            Self::SpecificTask(TaskIntent::LoanApplication) => "loan_application",
            Self::SpecificTask(TaskIntent::CardBlocking) => "card_blocking",
            Self::SpecificTask(TaskIntent::GeneralTask) => "general_task",
            Self::BasicQuery(BasicIntent::Other(name))
            | Self::AccountQuery(AccountIntent::Other(name))
            | Self::SpecificTask(TaskIntent::Other(name)) => name,
        }
    }
}

/// Which path produced a classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Parsed from the generative classifier's payload.
    Model,
    /// The payload parsed but named no known category; forced to a general inquiry.
    Coerced,
    /// Deterministic keyword rules.
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "ClassificationRecord", from = "ClassificationRecord")]
pub struct Classification {
    pub kind: RequestKind,
    pub entities: BTreeMap<String, String>,
    pub confidence: f64,
    pub source: ClassificationSource,
}

impl Classification {
    pub fn new(kind: RequestKind, confidence: f64, source: ClassificationSource) -> Self {
        Self { kind, entities: BTreeMap::new(), confidence: clamp_confidence(confidence), source }
    }

    pub fn with_entity(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entities.insert(key.into(), value.into());
        self
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn intent_name(&self) -> &str {
        self.kind.intent_name()
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|ch| if ch == ' ' || ch == '-' { '_' } else { ch.to_ascii_lowercase() })
        .collect()
}

/// Flat wire shape: `{category, intent, entities, confidence, source}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ClassificationRecord {
    category: Category,
    intent: String,
    #[serde(default)]
    entities: BTreeMap<String, String>,
    confidence: f64,
    source: ClassificationSource,
}

impl From<Classification> for ClassificationRecord {
    fn from(value: Classification) -> Self {
        Self {
            category: value.category(),
            intent: value.intent_name().to_string(),
            entities: value.entities,
            confidence: value.confidence,
            source: value.source,
        }
    }
}

impl From<ClassificationRecord> for Classification {
    fn from(value: ClassificationRecord) -> Self {
        let mut classification = Classification::new(
            RequestKind::from_labels(value.category, &value.intent),
            value.confidence,
            value.source,
        );
        classification.entities = value.entities;
        classification
    }
}
