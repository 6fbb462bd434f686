//! Domain module
//!
//! Core domain types: wire payloads, validated amounts and request context.

pub mod amount;
pub mod context;
pub mod error;
pub mod events;

pub use amount::{Amount, AmountError};
pub use context::OperationContext;
pub use error::DomainError;
pub use events::{Deposit, DepositHistory, Direction, FlagEvent, FlagValue};
