//! Threshold Flagger
//!
//! Tracks whether a wallet is currently flagged. Each raise overwrites the
//! stored window start (last event wins, windows are not merged); a removal
//! resets the wallet to the unflagged default.

use crate::codec::{FlagEventCodec, FlagValueCodec};
use crate::domain::{FlagEvent, FlagValue};
use crate::FLAG_STREAM;

use super::{Fold, FoldError};

/// Folds flag events into a per-wallet `FlagValue`
#[derive(Debug, Clone, Copy, Default)]
pub struct Flagger;

impl Fold for Flagger {
    type Event = FlagEventCodec;
    type State = FlagValueCodec;

    const GROUP: &'static str = "flagger";
    const INPUTS: &'static [&'static str] = &[FLAG_STREAM];

    fn fold(_key: &str, state: Option<FlagValue>, event: FlagEvent) -> Result<FlagValue, FoldError> {
        let mut value = state.unwrap_or_default();
        if event.flag_removed {
            value.flagged = false;
            value.rolling_period_start_unix = 0;
        } else {
            value.flagged = true;
            value.rolling_period_start_unix = event.rolling_period_start_unix;
        }
        Ok(value)
    }
}
