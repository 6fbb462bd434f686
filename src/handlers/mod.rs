//! Command Handlers module
//!
//! The query/command facade: deposits go out through an emitter, checks are
//! answered from the balance and flag views.

mod check_handler;
mod commands;
mod deposit_handler;

pub use check_handler::CheckHandler;
pub use commands::*;
pub use deposit_handler::DepositHandler;
