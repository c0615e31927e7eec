use teller_core::domain::{Classification, ClassificationSource};

pub const CLARIFICATION_PROMPT: &str =
    "I'm not quite sure what you need. Could you tell me a bit more? For example: check your balance, see recent transactions, apply for a loan, or block a card.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Clarify { reason_code: &'static str, user_message: String },
}

/// Optional confidence gate in front of the reasoner.
///
/// Without a threshold confidence is informational only. Keyword fallback
/// results are never gated; their fixed confidence says nothing about the
/// utterance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfidencePolicy {
    pub min_confidence: Option<f64>,
}

impl ConfidencePolicy {
    pub fn new(min_confidence: Option<f64>) -> Self {
        Self { min_confidence }
    }

    pub fn evaluate(&self, classification: &Classification) -> GuardrailDecision {
        let Some(threshold) = self.min_confidence else {
            return GuardrailDecision::Allow;
        };

        match classification.source {
            ClassificationSource::Fallback => GuardrailDecision::Allow,
            ClassificationSource::Model | ClassificationSource::Coerced
                if classification.confidence < threshold =>
            {
                GuardrailDecision::Clarify {
                    reason_code: "low_classifier_confidence",
                    user_message: CLARIFICATION_PROMPT.to_string(),
                }
            }
            ClassificationSource::Model | ClassificationSource::Coerced => GuardrailDecision::Allow,
        }
    }
}
