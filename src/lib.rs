//! depositaja Library
//!
//! Wallet balances and threshold flags kept as stateful stream processors
//! over a partitioned event log, with an HTTP facade on top.

pub mod api;
pub mod codec;
pub mod config;
pub mod db;
pub mod domain;
pub mod emitter;
mod error;
pub mod event_log;
pub mod handlers;
pub mod processor;
pub mod shutdown;
pub mod view;

pub use config::{Config, LogBackend, Roles};
pub use domain::{Amount, AmountError, Direction, DomainError, OperationContext};
pub use domain::{Deposit, DepositHistory, FlagEvent, FlagValue};
pub use error::{AppError, AppResult, ErrorResponse};

/// Stream of incoming deposits
pub const DEPOSIT_STREAM: &str = "deposit";

/// Stream of incoming withdrawals, amounts stored negated
pub const WITHDRAW_STREAM: &str = "withdraw";

/// Stream of flag decisions consumed by the flagger
pub const FLAG_STREAM: &str = "flag_wallet";
