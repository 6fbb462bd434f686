//! Stream Processor module
//!
//! A processor folds the events of its input topics into one aggregate per
//! key, keeps the aggregates in a partition-local store and writes every
//! updated aggregate to a private changelog (`<group>-table`). The
//! changelog is what views replicate and what a restarted processor
//! restores from.

mod collector;
mod error;
mod flagger;
mod runner;

use std::collections::HashMap;

use crate::codec::Codec;

pub use collector::BalanceCollector;
pub use error::{FoldError, ProcessorError};
pub use flagger::Flagger;
pub use runner::{Processor, ProcessorConfig};

/// Event payload type of a fold
pub type EventOf<F> = <<F as Fold>::Event as Codec>::Value;

/// Aggregate payload type of a fold
pub type StateOf<F> = <<F as Fold>::State as Codec>::Value;

/// Latest aggregate per key
pub type Table<S> = HashMap<String, S>;

/// A deterministic per-key state transition.
///
/// `fold` must depend only on its arguments so that replaying the same
/// events always yields the same aggregates.
pub trait Fold: Send + Sync + 'static {
    /// Codec of the input events
    type Event: Codec;

    /// Codec of the aggregate
    type State: Codec;

    /// Consumer group name, also the prefix of the changelog topic
    const GROUP: &'static str;

    /// Input topics, all co-partitioned with the changelog
    const INPUTS: &'static [&'static str];

    fn fold(key: &str, state: Option<StateOf<Self>>, event: EventOf<Self>) -> Result<StateOf<Self>, FoldError>;

    /// Changelog topic holding the aggregate snapshots
    fn table() -> String {
        table_topic(Self::GROUP)
    }
}

/// Changelog topic name for a group
pub fn table_topic(group: &str) -> String {
    format!("{}-table", group)
}
