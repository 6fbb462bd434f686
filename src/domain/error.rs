//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::AmountError;

/// Business rule violations raised before anything is written to the log.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Amount is zero, negative or not a number
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),
}
