use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::BankingBackend;
use crate::dialogue::reasoner::{NextAction, ReasoningResult};
use crate::dialogue::render;
use crate::dialogue::state::DialogueState;
use crate::domain::{
    AccountIntent, BackendOperation, CardType, Classification, ClassificationSource, RequestKind,
    Slot, TaskIntent,
};
use crate::errors::TurnError;

const GATHER_FALLBACK: &str =
    "I need some additional information to help you. What would you like to do today?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchState {
    Gathering,
    BasicResponse,
    AccountResponse,
    TaskResponse,
    Fallthrough,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub state: DispatchState,
    pub response: String,
    /// Backend operations actually invoked, in call order.
    pub backend_calls: Vec<BackendOperation>,
    pub error: Option<TurnError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchSettings {
    pub history_days: u32,
    pub max_transactions_shown: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self { history_days: 30, max_transactions_shown: 5 }
    }
}

/// Picks a handler by request kind and slot completeness and produces the reply.
///
/// Reads the dialogue state but never writes it, so an abandoned turn leaves
/// nothing half-committed.
#[derive(Clone)]
pub struct ActionDispatcher {
    backend: Arc<dyn BankingBackend>,
    settings: DispatchSettings,
}

impl ActionDispatcher {
    pub fn new(backend: Arc<dyn BankingBackend>, settings: DispatchSettings) -> Self {
        Self { backend, settings }
    }

    pub async fn dispatch(
        &self,
        utterance: &str,
        classification: &Classification,
        reasoning: &ReasoningResult,
        state: &DialogueState,
    ) -> DispatchOutcome {
        let mut calls = Vec::new();

        if reasoning.next_action == NextAction::GatherInfo {
            let response = match reasoning.next_slot() {
                Some(slot) => slot.prompt().to_string(),
                None => GATHER_FALLBACK.to_string(),
            };
            return outcome(DispatchState::Gathering, Ok(response), calls);
        }

        if classification.source == ClassificationSource::Coerced {
            return outcome(
                DispatchState::Fallthrough,
                Ok(render::FALLTHROUGH_PROMPT.to_string()),
                calls,
            );
        }

        let (dispatch_state, result) = match &classification.kind {
            RequestKind::BasicQuery(_) => {
                (DispatchState::BasicResponse, Ok(self.basic_response(utterance, &mut calls)))
            }
            RequestKind::AccountQuery(intent) => (
                DispatchState::AccountResponse,
                self.account_response(intent, state, &mut calls).await,
            ),
            RequestKind::SpecificTask(intent) => {
                (DispatchState::TaskResponse, self.task_response(intent, state, &mut calls).await)
            }
        };

        outcome(dispatch_state, result, calls)
    }

    fn basic_response(&self, utterance: &str, calls: &mut Vec<BackendOperation>) -> String {
        let lowered = utterance.to_lowercase();
        if lowered.contains("interest") || lowered.contains("rate") {
            calls.push(BackendOperation::InterestRates);
            render::render_rates(&self.backend.interest_rates())
        } else if lowered.contains("charge") || lowered.contains("fee") {
            calls.push(BackendOperation::FeeSchedule);
            render::render_fees(&self.backend.fee_schedule())
        } else {
            render::capability_menu()
        }
    }

    async fn account_response(
        &self,
        intent: &AccountIntent,
        state: &DialogueState,
        calls: &mut Vec<BackendOperation>,
    ) -> Result<String, TurnError> {
        let Some(account_number) = state.get(Slot::AccountNumber) else {
            return Ok("I need your account number to fetch your account details.".to_string());
        };

        calls.push(BackendOperation::GetAccountDetails);
        let account = self
            .backend
            .get_account_details(account_number)
            .await
            .map_err(|error| TurnError::from_backend(BackendOperation::GetAccountDetails, error))?
            .ok_or_else(|| TurnError::BackendNotFound {
                resource: "account",
                key: account_number.to_string(),
            })?;

        match intent {
            AccountIntent::BalanceInquiry => Ok(render::render_balance(&account)),
            AccountIntent::TransactionHistory => {
                calls.push(BackendOperation::GetTransactionHistory);
                let transactions = self
                    .backend
                    .get_transaction_history(account_number, self.settings.history_days)
                    .await
                    .map_err(|error| {
                        TurnError::from_backend(BackendOperation::GetTransactionHistory, error)
                    })?;
                Ok(render::render_transactions(
                    account_number,
                    &transactions,
                    self.settings.max_transactions_shown,
                ))
            }
            AccountIntent::AccountDetails | AccountIntent::Other(_) => {
                Ok(render::render_profile(&account))
            }
        }
    }

    async fn task_response(
        &self,
        intent: &TaskIntent,
        state: &DialogueState,
        calls: &mut Vec<BackendOperation>,
    ) -> Result<String, TurnError> {
        let Some(account_number) = state.get(Slot::AccountNumber) else {
            return Ok("I need your account number to proceed with this request.".to_string());
        };

        match intent {
            TaskIntent::LoanApplication => self.apply_loan(account_number, state, calls).await,
            TaskIntent::CardBlocking => self.block_card(account_number, state, calls).await,
            TaskIntent::GeneralTask | TaskIntent::Other(_) => {
                Ok(render::TASK_CLARIFICATION.to_string())
            }
        }
    }

    async fn apply_loan(
        &self,
        account_number: &str,
        state: &DialogueState,
        calls: &mut Vec<BackendOperation>,
    ) -> Result<String, TurnError> {
        let (Some(loan_type), Some(raw_amount)) =
            (state.get(Slot::LoanType), state.get(Slot::LoanAmount))
        else {
            return Ok(render::missing_loan_details(
                !state.contains(Slot::LoanType),
                !state.contains(Slot::LoanAmount),
            ));
        };

        let amount = parse_loan_amount(raw_amount)?;

        calls.push(BackendOperation::ApplyLoan);
        let decision = self
            .backend
            .apply_loan(account_number, loan_type, amount)
            .await
            .map_err(|error| TurnError::from_backend(BackendOperation::ApplyLoan, error))?;

        calls.push(BackendOperation::CheckCreditScore);
        let credit_score = match self.backend.check_credit_score(account_number).await {
            Ok(score) => Some(score),
            Err(error) => {
                warn!(
                    event_name = "dialogue.dispatch.credit_score_unavailable",
                    error = %error,
                    "rendering loan outcome without credit score"
                );
                None
            }
        };

        Ok(render::render_loan(&decision, credit_score))
    }

    async fn block_card(
        &self,
        account_number: &str,
        state: &DialogueState,
        calls: &mut Vec<BackendOperation>,
    ) -> Result<String, TurnError> {
        let card_type =
            state.get(Slot::CardType).and_then(CardType::from_slot_value).unwrap_or_default();

        calls.push(BackendOperation::BlockCard);
        let blocked = self
            .backend
            .block_card(account_number, card_type)
            .await
            .map_err(|error| TurnError::from_backend(BackendOperation::BlockCard, error))?;

        if blocked {
            Ok(render::render_card_blocked(card_type, Utc::now()))
        } else {
            Err(TurnError::BackendFailure {
                operation: BackendOperation::BlockCard,
                message: "backend declined the block request".to_string(),
            })
        }
    }
}

/// Strips thousands separators and currency marks, then parses a positive decimal.
pub fn parse_loan_amount(raw: &str) -> Result<Decimal, TurnError> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !matches!(ch, ',' | '₹' | '$' | '€' | '£') && !ch.is_whitespace())
        .collect();

    let invalid = || TurnError::Validation { slot: Slot::LoanAmount, detail: raw.to_string() };
    let amount = Decimal::from_str(&cleaned).map_err(|_| invalid())?;
    if amount <= Decimal::ZERO {
        return Err(invalid());
    }
    Ok(amount)
}

fn outcome(
    state: DispatchState,
    result: Result<String, TurnError>,
    backend_calls: Vec<BackendOperation>,
) -> DispatchOutcome {
    match result {
        Ok(response) => {
            debug!(
                event_name = "dialogue.dispatch.completed",
                state = ?state,
                calls = backend_calls.len()
            );
            DispatchOutcome { state, response, backend_calls, error: None }
        }
        Err(error) => {
            warn!(
                event_name = "dialogue.dispatch.failed",
                state = ?state,
                error_class = error.class(),
                error = %error,
                "turn resolved with an error message"
            );
            DispatchOutcome {
                state,
                response: error.user_message().to_string(),
                backend_calls,
                error: Some(error),
            }
        }
    }
}
