pub mod dispatcher;
pub mod reasoner;
pub mod render;
pub mod state;

pub use dispatcher::{
    parse_loan_amount, ActionDispatcher, DispatchOutcome, DispatchSettings, DispatchState,
};
pub use reasoner::{NextAction, Reasoner, ReasoningResult, SlotRequirements};
pub use state::DialogueState;
