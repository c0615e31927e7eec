pub mod backend;
pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod interaction;

pub use backend::{BankingBackend, InMemoryBankingBackend};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};
pub use dialogue::{
    ActionDispatcher, DialogueState, DispatchOutcome, DispatchSettings, DispatchState, NextAction,
    Reasoner, ReasoningResult, SlotRequirements,
};
pub use domain::{
    BackendOperation, CardType, Category, Classification, ClassificationSource, RequestKind, Slot,
};
pub use errors::{BackendError, ClassifierError, TurnError};
pub use interaction::{InMemoryInteractionLog, InteractionSink, TurnRecord};
