use once_cell::sync::Lazy;
use regex::Regex;
use teller_core::dialogue::DialogueState;
use teller_core::domain::{CardType, Slot};

static ACCOUNT_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\D)(\d{8})(?:\D|$)").expect("account number pattern compiles")
});

static LOAN_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[₹$€£]?\d+(?:,\d+)*(?:\.\d{2})?").expect("loan amount pattern compiles")
});

/// Checked in order; the first candidate contained anywhere in the utterance wins.
const LOAN_TYPE_CANDIDATES: [&str; 6] =
    ["personal loan", "home loan", "car loan", "personal", "home", "car"];

/// Pattern-based slot extraction. Pure with respect to the utterance and never
/// calls out of process.
#[derive(Clone, Debug, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Returns only the slots found in this utterance.
    pub fn extract(&self, utterance: &str) -> DialogueState {
        let mut found = DialogueState::new();

        let account_span =
            ACCOUNT_NUMBER.captures(utterance).and_then(|captures| captures.get(1));
        if let Some(account) = account_span {
            found.set(Slot::AccountNumber, account.as_str());
        }

        let amount = LOAN_AMOUNT.find_iter(utterance).find(|candidate| {
            account_span
                .map(|account| {
                    candidate.end() <= account.start() || candidate.start() >= account.end()
                })
                .unwrap_or(true)
        });
        if let Some(amount) = amount {
            found.set(Slot::LoanAmount, amount.as_str());
        }

        if let Some(loan_type) = extract_loan_type(utterance) {
            found.set(Slot::LoanType, loan_type);
        }

        if let Some(card_type) = extract_card_type(utterance) {
            found.set(Slot::CardType, card_type.as_str());
        }

        found
    }

    /// Merges this utterance's slots into `state` and reports which slots changed.
    pub fn extract_into(&self, utterance: &str, state: &mut DialogueState) -> Vec<Slot> {
        state.merge(self.extract(utterance))
    }
}

fn extract_loan_type(utterance: &str) -> Option<String> {
    let lowered = utterance.to_lowercase();
    LOAN_TYPE_CANDIDATES
        .iter()
        .find(|candidate| lowered.contains(*candidate))
        .map(|candidate| normalize_loan_type(candidate))
}

fn normalize_loan_type(candidate: &str) -> String {
    let product = candidate.strip_suffix(" loan").unwrap_or(candidate);
    let mut chars = product.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{capitalized} Loan")
}

fn extract_card_type(utterance: &str) -> Option<CardType> {
    let lowered = utterance.to_lowercase();
    if lowered.contains("credit card") {
        Some(CardType::Credit)
    } else if lowered.contains("debit card") {
        Some(CardType::Debit)
    } else {
        None
    }
}
