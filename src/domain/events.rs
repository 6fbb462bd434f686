//! Domain Events
//!
//! Payloads carried by the event log. Inputs (`Deposit`, `FlagEvent`) are
//! immutable facts; aggregates (`DepositHistory`, `FlagValue`) are the
//! snapshots processors write to their changelogs.
//!
//! All four are protobuf messages so that fields are tag-addressed and
//! unknown tags are skipped on decode.

/// A single deposit (positive amount) or withdrawal (negative amount).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Deposit {
    #[prost(string, tag = "1")]
    pub wallet_id: String,
    #[prost(double, tag = "2")]
    pub amount: f64,
}

impl Deposit {
    pub fn new(wallet_id: impl Into<String>, amount: f64) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            amount,
        }
    }
}

/// Every deposit observed for a wallet, in log order.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DepositHistory {
    #[prost(string, tag = "1")]
    pub wallet_id: String,
    #[prost(message, repeated, tag = "2")]
    pub deposits: Vec<Deposit>,
}

impl DepositHistory {
    /// Sum of all signed amounts in the history.
    pub fn balance(&self) -> f64 {
        self.deposits.iter().map(|d| d.amount).sum()
    }
}

/// Raises or clears the threshold flag for the wallet the record is keyed by.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FlagEvent {
    #[prost(int64, tag = "1")]
    pub rolling_period_start_unix: i64,
    #[prost(bool, tag = "2")]
    pub flag_removed: bool,
}

impl FlagEvent {
    /// Flag the wallet for the window starting at `rolling_period_start_unix`.
    pub fn raise(rolling_period_start_unix: i64) -> Self {
        Self {
            rolling_period_start_unix,
            flag_removed: false,
        }
    }

    /// Clear the flag.
    pub fn clear() -> Self {
        Self {
            rolling_period_start_unix: 0,
            flag_removed: true,
        }
    }
}

/// Current threshold flag of a wallet. The default value is unflagged.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FlagValue {
    #[prost(bool, tag = "1")]
    pub flagged: bool,
    #[prost(int64, tag = "2")]
    pub rolling_period_start_unix: i64,
}

/// Which write stream a service instance is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    Deposit,
    Withdraw,
}

impl Direction {
    /// Stream the service writes to.
    pub fn stream(self) -> &'static str {
        match self {
            Direction::Deposit => crate::DEPOSIT_STREAM,
            Direction::Withdraw => crate::WITHDRAW_STREAM,
        }
    }

    /// Signed amount as stored in the event.
    pub fn signed(self, amount: f64) -> f64 {
        match self {
            Direction::Deposit => amount,
            Direction::Withdraw => -amount,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Deposit => f.write_str("deposit"),
            Direction::Withdraw => f.write_str("withdraw"),
        }
    }
}
