//! Balance Collector
//!
//! Appends every deposit and withdrawal of a wallet to its history. The
//! balance is computed at query time as the sum of the history.
//!
//! Re-delivered events are appended again: at-least-once delivery can
//! double count, which is why the runner commits an input offset only after
//! the changelog write for it succeeded.

use crate::codec::{DepositCodec, DepositHistoryCodec};
use crate::domain::{Deposit, DepositHistory};
use crate::{DEPOSIT_STREAM, WITHDRAW_STREAM};

use super::{Fold, FoldError};

/// Folds deposits into a per-wallet `DepositHistory`
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceCollector;

impl Fold for BalanceCollector {
    type Event = DepositCodec;
    type State = DepositHistoryCodec;

    const GROUP: &'static str = "balance";
    const INPUTS: &'static [&'static str] = &[DEPOSIT_STREAM, WITHDRAW_STREAM];

    fn fold(
        _key: &str,
        state: Option<DepositHistory>,
        event: Deposit,
    ) -> Result<DepositHistory, FoldError> {
        let mut history = state.unwrap_or_default();
        history.wallet_id = event.wallet_id.clone();
        history.deposits.push(event);
        Ok(history)
    }
}
