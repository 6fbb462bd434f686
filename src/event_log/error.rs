//! Event Log Errors

/// Errors that can occur talking to the event log
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Topic has not been created
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// Partition index beyond the topic's partition count
    #[error("Partition {partition} out of range for topic {topic} ({partitions} partitions)")]
    PartitionOutOfRange {
        topic: String,
        partition: u32,
        partitions: u32,
    },

    /// Topic already exists with a different layout
    #[error("Topic {topic} has {existing} partitions, requested {requested}")]
    PartitionMismatch {
        topic: String,
        existing: u32,
        requested: u32,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LogError {
    /// Check if this error is transient (the log may recover)
    pub fn is_retryable(&self) -> bool {
        matches!(self, LogError::Database(_))
    }
}
