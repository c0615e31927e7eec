//! Append-only record of every turn, kept for inspection and analytics.
//!
//! Nothing here feeds back into classification or reasoning.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dialogue::{DialogueState, DispatchState, NextAction};
use crate::domain::Classification;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn_id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub utterance: String,
    pub classification: Classification,
    pub next_action: NextAction,
    pub dispatch_state: DispatchState,
    pub response: String,
    pub state_snapshot: DialogueState,
}

impl TurnRecord {
    pub fn new(
        session_id: impl Into<String>,
        utterance: impl Into<String>,
        classification: Classification,
        next_action: NextAction,
        dispatch_state: DispatchState,
        response: impl Into<String>,
        state_snapshot: DialogueState,
    ) -> Self {
        Self {
            turn_id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            timestamp: Utc::now(),
            utterance: utterance.into(),
            classification,
            next_action,
            dispatch_state,
            response: response.into(),
            state_snapshot,
        }
    }
}

pub trait InteractionSink: Send + Sync {
    fn record(&self, record: TurnRecord);
}

#[derive(Clone, Default)]
pub struct InMemoryInteractionLog {
    records: Arc<Mutex<Vec<TurnRecord>>>,
}

impl InMemoryInteractionLog {
    pub fn records(&self) -> Vec<TurnRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn records_for(&self, session_id: &str) -> Vec<TurnRecord> {
        self.records().into_iter().filter(|record| record.session_id == session_id).collect()
    }

    /// `(user, bot)` pairs in turn order.
    pub fn transcript(&self, session_id: &str) -> Vec<(String, String)> {
        self.records_for(session_id)
            .into_iter()
            .map(|record| (record.utterance, record.response))
            .collect()
    }

    pub fn len(&self) -> usize {
        match self.records.lock() {
            Ok(records) => records.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InteractionSink for InMemoryInteractionLog {
    fn record(&self, record: TurnRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}
