pub mod banking;
pub mod classification;
pub mod slot;

pub use banking::{
    Account, BackendOperation, FeeEntry, InterestRate, LoanDecision, LoanStatus, Transaction,
    TransactionKind,
};
pub use classification::{
    AccountIntent, BasicIntent, Category, Classification, ClassificationSource, RequestKind,
    TaskIntent,
};
pub use slot::{CardType, Slot, UnknownSlot};
