//! Response text for the dispatcher.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::{Account, CardType, FeeEntry, InterestRate, LoanDecision, Transaction};

pub const ANYTHING_ELSE: &str = "Is there anything else I can help you with?";

pub const FALLTHROUGH_PROMPT: &str =
    "I'm here to help you with your banking needs. Could you please tell me what you'd like to do today?";

pub const TASK_CLARIFICATION: &str =
    "I can help you with loan applications or card blocking. What would you like to do?";

pub fn capability_menu() -> String {
    [
        "I'm here to help you with:",
        "• Account balance and transaction inquiries",
        "• Loan applications (Personal, Home, Car loans)",
        "• Card blocking services",
        "• Interest rates and charges information",
        "",
        "What would you like to know about?",
    ]
    .join("\n")
}

/// Two decimal places with thousands separators: `15000.5` -> `15,000.50`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

pub fn render_rates(rates: &[InterestRate]) -> String {
    let mut text = String::from("Here are our current interest rates:\n");
    for rate in rates {
        text.push_str(&format!(
            "• {}: {}% per annum\n",
            rate.label(),
            rate.annual_rate_pct.normalize()
        ));
    }
    text
}

pub fn render_fees(fees: &[FeeEntry]) -> String {
    let mut lines = vec!["Our current charges:".to_string()];
    lines.extend(fees.iter().map(|fee| format!("• {}: {}", fee.service, fee.charge)));
    lines.join("\n")
}

pub fn render_balance(account: &Account) -> String {
    format!(
        "Hello {}!\n\nYour account balance details:\n• Account Number: {}\n• Account Type: {}\n• Available Balance: ₹{}\n\n{ANYTHING_ELSE}",
        account.customer_name,
        account.account_number,
        account.account_type,
        format_amount(account.balance),
    )
}

pub fn render_profile(account: &Account) -> String {
    format!(
        "Account Details for {}:\n• Account Number: {}\n• Account Type: {}\n• Balance: ₹{}\n• Email: {}\n• Phone: {}",
        account.customer_name,
        account.account_number,
        account.account_type,
        format_amount(account.balance),
        account.email,
        account.phone,
    )
}

/// At most `limit` entries, in the order the backend returned them.
pub fn render_transactions(
    account_number: &str,
    transactions: &[Transaction],
    limit: usize,
) -> String {
    if transactions.is_empty() {
        return "No recent transactions found for your account.".to_string();
    }

    let mut text = format!("Here are your recent transactions for account {account_number}:\n\n");
    for transaction in transactions.iter().take(limit) {
        text.push_str(&format!(
            "• {} - {} - ₹{} - {}\n",
            transaction.date.format("%Y-%m-%d"),
            transaction.kind,
            format_amount(transaction.amount),
            transaction.description,
        ));
    }
    text
}

pub fn render_loan(decision: &LoanDecision, credit_score: Option<u16>) -> String {
    let mut text = format!(
        "Loan Application Processed!\n\nApplication ID: {}\nStatus: {}\n\n{}\n",
        decision.application_id, decision.status, decision.message,
    );
    if let Some(score) = credit_score {
        text.push_str(&format!("\nYour credit score: {score}\n"));
    }
    text.push('\n');
    text.push_str(ANYTHING_ELSE);
    text
}

pub fn render_card_blocked(card_type: CardType, blocked_at: DateTime<Utc>) -> String {
    format!(
        "Your {card_type} card has been successfully blocked for security.\n\n• Card Status: BLOCKED\n• Date & Time: {} UTC\n• Reason: Customer Request\n\nA new card will be dispatched to your registered address within 5-7 business days.\n\nFor immediate assistance, please contact our 24/7 helpline.\n{ANYTHING_ELSE}",
        blocked_at.format("%Y-%m-%d %H:%M:%S"),
    )
}

/// Follow-up when a loan request reaches execution without its details.
pub fn missing_loan_details(missing_type: bool, missing_amount: bool) -> String {
    let mut missing = Vec::new();
    if missing_type {
        missing.push("loan type");
    }
    if missing_amount {
        missing.push("loan amount");
    }
    format!("I need the {} to process your loan application.", missing.join(" and "))
}
