//! Command definitions
//!
//! Commands represent intentions to change the system state; results are
//! what handlers hand back to the API layer.

/// Command to move money into (or out of) a wallet
#[derive(Debug, Clone)]
pub struct DepositCommand {
    pub wallet_id: String,
    /// Unsigned amount as requested; the handler's direction sets the sign
    pub amount: f64,
}

impl DepositCommand {
    pub fn new(wallet_id: impl Into<String>, amount: f64) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            amount,
        }
    }
}

/// Current state of a wallet as seen by the views
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub wallet_id: String,
    pub balance: f64,
    pub above_threshold: bool,
}

impl CheckResult {
    /// Result for a wallet the views know nothing about
    pub fn unknown(wallet_id: impl Into<String>) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            balance: 0.0,
            above_threshold: false,
        }
    }
}
