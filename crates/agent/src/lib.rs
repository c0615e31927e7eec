//! Language-facing side of the banking assistant.
//!
//! Each turn runs a fixed loop:
//! 1. **Extraction** (`extractor`) - pattern rules pull slots out of the utterance
//! 2. **Classification** (`classifier`) - generative model first, keyword rules when it fails
//! 3. **Guardrails** (`guardrails`) - optional confidence gate
//! 4. **Reason and dispatch** - delegated to `teller-core`
//! 5. **Record** - every completed turn lands in the interaction log
//!
//! `DialogueSession` (see `runtime`) drives one conversation; `SessionRegistry`
//! serves many at once.
//!
//! The model only ever labels utterances. Balances, approvals and card blocks
//! come from the banking backend.

pub mod classifier;
pub mod extractor;
pub mod guardrails;
pub mod llm;
pub mod runtime;
pub mod sessions;

pub use classifier::{IntentClassifier, KeywordClassifier, ModelClassifier, ResilientClassifier};
pub use extractor::EntityExtractor;
pub use guardrails::{ConfidencePolicy, GuardrailDecision};
pub use llm::{HttpLlmClient, LlmClient};
pub use runtime::{DialogueRuntime, DialogueSession};
pub use sessions::SessionRegistry;
