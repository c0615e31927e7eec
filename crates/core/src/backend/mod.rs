//! Banking backend boundary.
//!
//! The dialogue core only ever talks to the bank through [`BankingBackend`].
//! Approval thresholds, card switches and ledgers live behind it.

pub mod in_memory;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Account, CardType, FeeEntry, InterestRate, LoanDecision, Transaction};
use crate::errors::BackendError;

pub use in_memory::InMemoryBankingBackend;

#[async_trait]
pub trait BankingBackend: Send + Sync {
    /// `Ok(None)` when no such account exists.
    async fn get_account_details(&self, account_number: &str)
        -> Result<Option<Account>, BackendError>;

    /// Entries come back in whatever order the backend keeps them; callers do not re-sort.
    async fn get_transaction_history(
        &self,
        account_number: &str,
        days: u32,
    ) -> Result<Vec<Transaction>, BackendError>;

    async fn check_credit_score(&self, account_number: &str) -> Result<u16, BackendError>;

    async fn block_card(&self, account_number: &str, card_type: CardType)
        -> Result<bool, BackendError>;

    async fn apply_loan(
        &self,
        account_number: &str,
        loan_type: &str,
        amount: Decimal,
    ) -> Result<LoanDecision, BackendError>;

    fn interest_rates(&self) -> Vec<InterestRate>;

    fn fee_schedule(&self) -> Vec<FeeEntry>;
}
