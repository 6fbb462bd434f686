//! Amount Value Object
//!
//! A validated, strictly positive monetary amount taken from a client
//! request. The sign of a stored event is decided by the stream it is
//! written to, never by the client.

/// Amount-specific errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AmountError {
    #[error("amount must be more than 0")]
    NotPositive(f64),

    #[error("amount must be a finite number")]
    NotFinite,
}

/// A strictly positive, finite amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amount(f64);

impl Amount {
    /// Create a new Amount with validation.
    pub fn new(value: f64) -> Result<Self, AmountError> {
        if value.is_nan() || value.is_infinite() {
            return Err(AmountError::NotFinite);
        }

        if value <= 0.0 {
            return Err(AmountError::NotPositive(value));
        }

        Ok(Self(value))
    }

    /// Get the underlying value.
    pub fn value(&self) -> f64 {
        self.0
    }
}
