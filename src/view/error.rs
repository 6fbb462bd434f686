//! View Errors

use crate::codec::CodecError;
use crate::event_log::{LogError, LogPosition};

/// Errors that stop a view
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// Changelog record could not be decoded
    #[error("Malformed changelog record at {position}: {source}")]
    Decode {
        position: LogPosition,
        #[source]
        source: CodecError,
    },

    /// Log transport error
    #[error("Event log error: {0}")]
    Log(#[from] LogError),
}
