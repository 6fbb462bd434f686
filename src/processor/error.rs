//! Processor Errors

use crate::codec::CodecError;
use crate::event_log::{LogError, LogPosition};

/// A fold refused an event.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Event rejected for key {key}: {reason}")]
pub struct FoldError {
    pub key: String,
    pub reason: String,
}

impl FoldError {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that stop a processor
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Input or changelog record could not be decoded
    #[error("Malformed record at {position}: {source}")]
    Decode {
        position: LogPosition,
        #[source]
        source: CodecError,
    },

    /// Fold rejected the event; the offset was not committed
    #[error("Fold failed at {position}: {source}")]
    Fold {
        position: LogPosition,
        #[source]
        source: FoldError,
    },

    /// Log transport error
    #[error("Event log error: {0}")]
    Log(#[from] LogError),

    /// A partition task panicked or was aborted
    #[error("Partition task failed: {0}")]
    Task(String),
}

impl ProcessorError {
    /// Position of the offending record, if the error is tied to one
    pub fn position(&self) -> Option<&LogPosition> {
        match self {
            ProcessorError::Decode { position, .. } | ProcessorError::Fold { position, .. } => {
                Some(position)
            }
            ProcessorError::Log(_) | ProcessorError::Task(_) => None,
        }
    }
}
