//! Check Handler
//!
//! Answers balance checks from the replicated views. Views are eventually
//! consistent, so a wallet whose first deposit has not replicated yet reads
//! as unknown.

use crate::processor::{BalanceCollector, Flagger};
use crate::view::View;

use super::CheckResult;

/// Read side of the facade
#[derive(Clone)]
pub struct CheckHandler {
    balances: View<BalanceCollector>,
    flags: View<Flagger>,
}

impl CheckHandler {
    pub fn new(balances: View<BalanceCollector>, flags: View<Flagger>) -> Self {
        Self { balances, flags }
    }

    /// A wallet without a deposit history gets the default answer without
    /// consulting the flag view.
    pub fn execute(&self, wallet_id: &str) -> CheckResult {
        let Some(history) = self.balances.get(wallet_id) else {
            tracing::debug!(wallet_id = %wallet_id, "Wallet not found in balance view");
            return CheckResult::unknown(wallet_id);
        };

        let above_threshold = self
            .flags
            .get(wallet_id)
            .map(|flag| flag.flagged)
            .unwrap_or(false);

        CheckResult {
            wallet_id: wallet_id.to_string(),
            balance: history.balance(),
            above_threshold,
        }
    }
}
