use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::Rng;
use rust_decimal::Decimal;

use crate::backend::BankingBackend;
use crate::domain::{
    Account, CardType, FeeEntry, InterestRate, LoanDecision, LoanStatus, Transaction,
    TransactionKind,
};
use crate::errors::BackendError;

const APPROVAL_SCORE: u16 = 700;
const REVIEW_SCORE: u16 = 600;

struct AccountSeed {
    account_number: &'static str,
    account_type: &'static str,
    balance_minor: i64,
    customer_name: &'static str,
    phone: &'static str,
    email: &'static str,
    credit_score: u16,
}

struct TransactionSeed {
    account_number: &'static str,
    date: (i32, u32, u32),
    kind: TransactionKind,
    amount: i64,
    description: &'static str,
}

const SEED_ACCOUNTS: &[AccountSeed] = &[
    AccountSeed {
        account_number: "12345678",
        account_type: "Savings",
        balance_minor: 1_500_050,
        customer_name: "John Doe",
        phone: "9876543210",
        email: "john.doe@email.com",
        credit_score: 750,
    },
    AccountSeed {
        account_number: "87654321",
        account_type: "Current",
        balance_minor: 2_500_075,
        customer_name: "Jane Smith",
        phone: "9876543211",
        email: "jane.smith@email.com",
        credit_score: 680,
    },
];

/// Newest first.
const SEED_TRANSACTIONS: &[TransactionSeed] = &[
    TransactionSeed {
        account_number: "12345678",
        date: (2024, 7, 25),
        kind: TransactionKind::Credit,
        amount: 5000,
        description: "Salary Credit",
    },
    TransactionSeed {
        account_number: "12345678",
        date: (2024, 7, 24),
        kind: TransactionKind::Debit,
        amount: 1200,
        description: "Online Purchase",
    },
    TransactionSeed {
        account_number: "12345678",
        date: (2024, 7, 23),
        kind: TransactionKind::Debit,
        amount: 500,
        description: "ATM Withdrawal",
    },
    TransactionSeed {
        account_number: "12345678",
        date: (2024, 7, 22),
        kind: TransactionKind::Credit,
        amount: 2000,
        description: "Transfer from savings",
    },
];

/// (product key, rate in hundredths of a percent)
const SEED_RATES: &[(&str, i64)] = &[
    ("personal_loan", 1050),
    ("home_loan", 875),
    ("car_loan", 925),
    ("savings_account", 400),
    ("fixed_deposit", 650),
];

const SEED_FEES: &[(&str, &str)] = &[
    ("ATM withdrawal (own)", "Free"),
    ("ATM withdrawal (other banks)", "₹20 per transaction"),
    ("SMS alerts", "₹25 per month"),
    ("Cheque book", "₹200 per booklet"),
    ("Account maintenance", "₹500 per quarter (waived for minimum balance ≥ ₹10,000)"),
];

/// Deterministic in-process bank used by the CLI and by tests.
#[derive(Clone)]
pub struct InMemoryBankingBackend {
    accounts: BTreeMap<String, Account>,
    transactions: BTreeMap<String, Vec<Transaction>>,
    interest_rates: Vec<InterestRate>,
    fees: Vec<FeeEntry>,
    blocked_cards: Arc<Mutex<BTreeSet<String>>>,
}

impl Default for InMemoryBankingBackend {
    fn default() -> Self {
        Self::seeded()
    }
}

impl InMemoryBankingBackend {
    pub fn seeded() -> Self {
        let accounts = SEED_ACCOUNTS
            .iter()
            .map(|seed| {
                let account = Account {
                    account_number: seed.account_number.to_string(),
                    account_type: seed.account_type.to_string(),
                    balance: Decimal::new(seed.balance_minor, 2),
                    customer_name: seed.customer_name.to_string(),
                    phone: seed.phone.to_string(),
                    email: seed.email.to_string(),
                    credit_score: seed.credit_score,
                };
                (account.account_number.clone(), account)
            })
            .collect();

        let mut transactions: BTreeMap<String, Vec<Transaction>> = BTreeMap::new();
        for seed in SEED_TRANSACTIONS {
            let (year, month, day) = seed.date;
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };
            transactions.entry(seed.account_number.to_string()).or_default().push(Transaction {
                date,
                kind: seed.kind,
                amount: Decimal::from(seed.amount),
                description: seed.description.to_string(),
            });
        }

        Self {
            accounts,
            transactions,
            interest_rates: SEED_RATES
                .iter()
                .map(|(product, rate)| InterestRate::new(*product, Decimal::new(*rate, 2)))
                .collect(),
            fees: SEED_FEES
                .iter()
                .map(|(service, charge)| FeeEntry::new(*service, *charge))
                .collect(),
            blocked_cards: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.insert(account.account_number.clone(), account);
        self
    }

    pub fn with_transactions(
        mut self,
        account_number: &str,
        transactions: Vec<Transaction>,
    ) -> Self {
        self.transactions.insert(account_number.to_string(), transactions);
        self
    }

    pub fn is_card_blocked(&self, account_number: &str, card_type: CardType) -> bool {
        let key = card_key(account_number, card_type);
        match self.blocked_cards.lock() {
            Ok(blocked) => blocked.contains(&key),
            Err(poisoned) => poisoned.into_inner().contains(&key),
        }
    }

    fn credit_score(&self, account_number: &str) -> u16 {
        self.accounts.get(account_number).map(|account| account.credit_score).unwrap_or(0)
    }
}

#[async_trait]
impl BankingBackend for InMemoryBankingBackend {
    async fn get_account_details(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, BackendError> {
        Ok(self.accounts.get(account_number).cloned())
    }

    async fn get_transaction_history(
        &self,
        account_number: &str,
        _days: u32,
    ) -> Result<Vec<Transaction>, BackendError> {
        Ok(self.transactions.get(account_number).cloned().unwrap_or_default())
    }

    async fn check_credit_score(&self, account_number: &str) -> Result<u16, BackendError> {
        Ok(self.credit_score(account_number))
    }

    async fn block_card(
        &self,
        account_number: &str,
        card_type: CardType,
    ) -> Result<bool, BackendError> {
        let key = card_key(account_number, card_type);
        match self.blocked_cards.lock() {
            Ok(mut blocked) => blocked.insert(key),
            Err(poisoned) => poisoned.into_inner().insert(key),
        };
        Ok(true)
    }

    async fn apply_loan(
        &self,
        account_number: &str,
        loan_type: &str,
        amount: Decimal,
    ) -> Result<LoanDecision, BackendError> {
        let credit_score = self.credit_score(account_number);
        let (status, message) = if credit_score >= APPROVAL_SCORE {
            (
                LoanStatus::Approved,
                format!(
                    "Congratulations! Your {loan_type} application for ₹{} has been approved.",
                    crate::dialogue::render::format_amount(amount)
                ),
            )
        } else if credit_score >= REVIEW_SCORE {
            (
                LoanStatus::UnderReview,
                format!(
                    "Your {loan_type} application is under review. We'll contact you within 2-3 business days."
                ),
            )
        } else {
            (
                LoanStatus::Rejected,
                format!(
                    "Unfortunately, your {loan_type} application has been rejected due to low credit score."
                ),
            )
        };

        let application_id = format!("LOAN{}", rand::thread_rng().gen_range(100_000..=999_999));

        Ok(LoanDecision {
            application_id,
            status,
            message,
            amount,
            loan_type: loan_type.to_string(),
        })
    }

    fn interest_rates(&self) -> Vec<InterestRate> {
        self.interest_rates.clone()
    }

    fn fee_schedule(&self) -> Vec<FeeEntry> {
        self.fees.clone()
    }
}

fn card_key(account_number: &str, card_type: CardType) -> String {
    format!("{account_number}_{}", card_type.as_str())
}
