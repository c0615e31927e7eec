use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named pieces of information the dialogue collects before it can act.
///
/// Variant order is the gathering priority: when several slots are missing the
/// earliest one is asked for first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    AccountNumber,
    LoanType,
    LoanAmount,
    CardType,
}

impl Slot {
    pub const ALL: [Slot; 4] =
        [Slot::AccountNumber, Slot::LoanType, Slot::LoanAmount, Slot::CardType];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountNumber => "account_number",
            Self::LoanType => "loan_type",
            Self::LoanAmount => "loan_amount",
            Self::CardType => "card_type",
        }
    }

    /// Question put to the user when this slot is the next one to fill.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::AccountNumber => {
                "To assist you better, I'll need your account number. Could you please provide your 8-digit account number?"
            }
            Self::LoanType => {
                "What type of loan are you interested in? We offer:\n• Personal Loan\n• Home Loan\n• Car Loan\n\nPlease let me know which one you'd prefer."
            }
            Self::LoanAmount => {
                "What loan amount are you looking for? Please specify the amount you need."
            }
            Self::CardType => "Which card should I act on, your debit card or your credit card?",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown slot `{0}`")]
pub struct UnknownSlot(pub String);

impl FromStr for Slot {
    type Err = UnknownSlot;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "account_number" => Ok(Self::AccountNumber),
            "loan_type" => Ok(Self::LoanType),
            "loan_amount" => Ok(Self::LoanAmount),
            "card_type" => Ok(Self::CardType),
            other => Err(UnknownSlot(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    #[default]
    Debit,
    Credit,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }

    /// Reads a `card_type` slot value; anything unrecognised is treated as unset.
    pub fn from_slot_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debit" => Some(Self::Debit),
            "credit" => Some(Self::Credit),
            _ => None,
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{CardType, Slot};

    #[test]
    fn slot_names_round_trip_through_wire_form() {
        for slot in Slot::ALL {
            assert_eq!(slot.as_str().parse::<Slot>(), Ok(slot));
        }
        assert!("pin_code".parse::<Slot>().is_err());
    }

    #[test]
    fn slot_ordering_matches_gathering_priority() {
        let mut slots = vec![Slot::LoanAmount, Slot::CardType, Slot::AccountNumber, Slot::LoanType];
        slots.sort();
        assert_eq!(slots, Slot::ALL.to_vec());
    }

    #[test]
    fn card_type_defaults_to_debit() {
        assert_eq!(CardType::default(), CardType::Debit);
        assert_eq!(CardType::from_slot_value("Credit"), Some(CardType::Credit));
        assert_eq!(CardType::from_slot_value("amex"), None);
    }
}
