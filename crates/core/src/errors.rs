use std::time::Duration;

use thiserror::Error;

use crate::domain::{BackendOperation, Slot};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("{resource} `{key}` not found")]
    NotFound { resource: &'static str, key: String },
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("classifier timed out after {0:?}")]
    Timeout(Duration),
    #[error("classifier payload malformed: {0}")]
    MalformedPayload(String),
}

/// Everything that can go wrong inside one turn. None of these escape `chat()`;
/// each one resolves to a user-facing message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error(transparent)]
    ClassifierUnavailable(#[from] ClassifierError),
    #[error("invalid value for {slot}: {detail}")]
    Validation { slot: Slot, detail: String },
    #[error("{resource} `{key}` not found")]
    BackendNotFound { resource: &'static str, key: String },
    #[error("backend operation {operation} failed: {message}")]
    BackendFailure { operation: BackendOperation, message: String },
    #[error("utterance could not be interpreted")]
    UnrecoverableInput,
}

impl TurnError {
    pub fn from_backend(operation: BackendOperation, error: BackendError) -> Self {
        match error {
            BackendError::NotFound { resource, key } => Self::BackendNotFound { resource, key },
            BackendError::Unavailable(message) => Self::BackendFailure { operation, message },
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ClassifierUnavailable(_) | Self::UnrecoverableInput => {
                "I'm here to help! Please tell me what you need assistance with."
            }
            Self::Validation { slot: Slot::LoanAmount, .. } => {
                "Please provide a valid loan amount in numbers."
            }
            Self::Validation { .. } => {
                "That value doesn't look right. Could you please provide it again?"
            }
            Self::BackendNotFound { .. } => {
                "I couldn't find an account with that number. Please check and try again."
            }
            Self::BackendFailure { operation: BackendOperation::BlockCard, .. } => {
                "I couldn't block your card at the moment. Please try again or contact customer service."
            }
            Self::BackendFailure { .. } => {
                "Our banking services are not responding right now. Please try again shortly or contact customer support."
            }
        }
    }

    /// Short machine label for logs and interaction analytics.
    pub fn class(&self) -> &'static str {
        match self {
            Self::ClassifierUnavailable(_) => "classifier_unavailable",
            Self::Validation { .. } => "validation",
            Self::BackendNotFound { .. } => "backend_not_found",
            Self::BackendFailure { .. } => "backend_failure",
            Self::UnrecoverableInput => "unrecoverable_input",
        }
    }
}
