use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dialogue::state::DialogueState;
use crate::domain::{BackendOperation, Category, Classification, Slot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    GatherInfo,
    Execute,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningResult {
    pub missing_slots: Vec<Slot>,
    pub backend_calls_needed: BTreeSet<BackendOperation>,
    pub next_action: NextAction,
}

impl ReasoningResult {
    /// `next_action` is derived, never supplied, so it cannot disagree with `missing_slots`.
    pub fn new(missing_slots: Vec<Slot>, backend_calls_needed: BTreeSet<BackendOperation>) -> Self {
        let next_action =
            if missing_slots.is_empty() { NextAction::Execute } else { NextAction::GatherInfo };
        Self { missing_slots, backend_calls_needed, next_action }
    }

    /// Highest-priority missing slot.
    pub fn next_slot(&self) -> Option<Slot> {
        self.missing_slots.iter().min().copied()
    }
}

/// Declarative table of what each category and intent needs before it can run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotRequirements {
    by_category: Vec<(Category, Vec<Slot>)>,
    by_intent: Vec<(String, Vec<Slot>)>,
    calls_by_intent: Vec<(String, Vec<BackendOperation>)>,
}

impl Default for SlotRequirements {
    fn default() -> Self {
        use BackendOperation::{
            ApplyLoan, BlockCard, CheckCreditScore, GetAccountDetails, GetTransactionHistory,
        };

        Self::empty()
            .require_for_category(Category::AccountQuery, [Slot::AccountNumber])
            .require_for_category(Category::SpecificTask, [Slot::AccountNumber])
            .require_for_intent("loan_application", [Slot::LoanType, Slot::LoanAmount])
            .calls_for_intent("balance_inquiry", [GetAccountDetails])
            .calls_for_intent("transaction_history", [GetAccountDetails, GetTransactionHistory])
            .calls_for_intent("account_details", [GetAccountDetails])
            .calls_for_intent("loan_application", [ApplyLoan, CheckCreditScore])
            .calls_for_intent("card_blocking", [BlockCard])
    }
}

impl SlotRequirements {
    pub fn empty() -> Self {
        Self { by_category: Vec::new(), by_intent: Vec::new(), calls_by_intent: Vec::new() }
    }

    pub fn require_for_category(
        mut self,
        category: Category,
        slots: impl IntoIterator<Item = Slot>,
    ) -> Self {
        self.by_category.push((category, slots.into_iter().collect()));
        self
    }

    pub fn require_for_intent(
        mut self,
        intent: impl Into<String>,
        slots: impl IntoIterator<Item = Slot>,
    ) -> Self {
        self.by_intent.push((intent.into(), slots.into_iter().collect()));
        self
    }

    pub fn calls_for_intent(
        mut self,
        intent: impl Into<String>,
        calls: impl IntoIterator<Item = BackendOperation>,
    ) -> Self {
        self.calls_by_intent.push((intent.into(), calls.into_iter().collect()));
        self
    }

    /// Category requirements first, then intent requirements, without duplicates.
    pub fn required_slots(&self, classification: &Classification) -> Vec<Slot> {
        let category = classification.category();
        let intent = classification.intent_name();

        let category_slots = self
            .by_category
            .iter()
            .filter(|(candidate, _)| *candidate == category)
            .flat_map(|(_, slots)| slots.iter().copied());
        let intent_slots = self
            .by_intent
            .iter()
            .filter(|(candidate, _)| candidate == intent)
            .flat_map(|(_, slots)| slots.iter().copied());

        let mut seen = BTreeSet::new();
        category_slots.chain(intent_slots).filter(|slot| seen.insert(*slot)).collect()
    }

    pub fn backend_calls(&self, classification: &Classification) -> BTreeSet<BackendOperation> {
        let intent = classification.intent_name();
        self.calls_by_intent
            .iter()
            .filter(|(candidate, _)| candidate == intent)
            .flat_map(|(_, calls)| calls.iter().copied())
            .collect()
    }
}

/// Decides between asking for more information and executing.
///
/// Only ever adds requirements. Classifier confidence is informational here.
#[derive(Clone, Debug, Default)]
pub struct Reasoner {
    requirements: SlotRequirements,
}

impl Reasoner {
    pub fn new(requirements: SlotRequirements) -> Self {
        Self { requirements }
    }

    pub fn reason(
        &self,
        classification: &Classification,
        state: &DialogueState,
    ) -> ReasoningResult {
        let missing_slots = self
            .requirements
            .required_slots(classification)
            .into_iter()
            .filter(|slot| !state.contains(*slot))
            .collect();

        ReasoningResult::new(missing_slots, self.requirements.backend_calls(classification))
    }
}
