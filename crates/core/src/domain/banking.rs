use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_number: String,
    pub account_type: String,
    pub balance: Decimal,
    pub customer_name: String,
    pub phone: String,
    pub email: String,
    pub credit_score: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Credit => "Credit",
            Self::Debit => "Debit",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Approved,
    UnderReview,
    Rejected,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approved => "Approved",
            Self::UnderReview => "Under Review",
            Self::Rejected => "Rejected",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDecision {
    pub application_id: String,
    pub status: LoanStatus,
    pub message: String,
    pub amount: Decimal,
    pub loan_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestRate {
    /// Machine key, e.g. `home_loan`.
    pub product: String,
    pub annual_rate_pct: Decimal,
}

impl InterestRate {
    pub fn new(product: impl Into<String>, annual_rate_pct: Decimal) -> Self {
        Self { product: product.into(), annual_rate_pct }
    }

    /// `home_loan` -> `Home Loan`.
    pub fn label(&self) -> String {
        self.product
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEntry {
    pub service: String,
    pub charge: String,
}

impl FeeEntry {
    pub fn new(service: impl Into<String>, charge: impl Into<String>) -> Self {
        Self { service: service.into(), charge: charge.into() }
    }
}

/// Operations exposed by the banking backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendOperation {
    GetAccountDetails,
    GetTransactionHistory,
    CheckCreditScore,
    BlockCard,
    ApplyLoan,
    InterestRates,
    FeeSchedule,
}

impl BackendOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetAccountDetails => "get_account_details",
            Self::GetTransactionHistory => "get_transaction_history",
            Self::CheckCreditScore => "check_credit_score",
            Self::BlockCard => "block_card",
            Self::ApplyLoan => "apply_loan",
            Self::InterestRates => "interest_rates",
            Self::FeeSchedule => "fee_schedule",
        }
    }
}

impl fmt::Display for BackendOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::InterestRate;

    #[test]
    fn rate_label_title_cases_product_key() {
        assert_eq!(
            InterestRate::new("fixed_deposit", Decimal::new(65, 1)).label(),
            "Fixed Deposit"
        );
        assert_eq!(InterestRate::new("car_loan", Decimal::new(925, 2)).label(), "Car Loan");
    }
}
