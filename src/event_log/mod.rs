//! Event Log module
//!
//! The partitioned, ordered, durable append log everything else is built on.
//! Records with the same key always land in the same partition, so per-key
//! order is the partition's offset order. Consumer groups keep one committed
//! offset per topic partition.

mod error;
mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use error::LogError;
pub use memory::MemoryLog;
pub use postgres::PgEventLog;

/// Where an appended record ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPosition {
    pub topic: String,
    pub partition: u32,
    pub offset: i64,
}

impl std::fmt::Display for LogPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.topic, self.partition, self.offset)
    }
}

/// A record read back from the log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub topic: String,
    pub partition: u32,
    pub offset: i64,
    pub key: String,
    pub value: Vec<u8>,
    pub appended_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn position(&self) -> LogPosition {
        LogPosition {
            topic: self.topic.clone(),
            partition: self.partition,
            offset: self.offset,
        }
    }
}

/// Durable partitioned log with consumer-group offset tracking.
///
/// Offsets are dense and start at 0 in every partition. A committed offset
/// is the next offset the group wants to read.
#[async_trait]
pub trait EventLog: Send + Sync + 'static {
    /// Create the topic if missing. Fails if it exists with another
    /// partition count.
    async fn ensure_topic(&self, topic: &str, partitions: u32) -> Result<(), LogError>;

    async fn partitions(&self, topic: &str) -> Result<u32, LogError>;

    /// Append one record and return once it is durable.
    async fn append(
        &self,
        topic: &str,
        partition: u32,
        key: &str,
        value: Vec<u8>,
    ) -> Result<LogPosition, LogError>;

    /// Up to `max` records with `offset >= from`, in offset order.
    async fn read(
        &self,
        topic: &str,
        partition: u32,
        from: i64,
        max: usize,
    ) -> Result<Vec<LogRecord>, LogError>;

    /// Offset the next appended record will get.
    async fn end_offset(&self, topic: &str, partition: u32) -> Result<i64, LogError>;

    async fn committed(
        &self,
        group: &str,
        topic: &str,
        partition: u32,
    ) -> Result<Option<i64>, LogError>;

    async fn commit(
        &self,
        group: &str,
        topic: &str,
        partition: u32,
        offset: i64,
    ) -> Result<(), LogError>;
}

/// Route a key to a partition (32-bit FNV-1a).
pub fn partition_for(key: &str, partitions: u32) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let hash = key.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(PRIME)
    });

    hash % partitions.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_for_is_stable() {
        // reference FNV-1a values
        assert_eq!(partition_for("", u32::MAX), 0x811c_9dc5 % u32::MAX);
        assert_eq!(partition_for("a", u32::MAX), 0xe40c_292c);
        assert_eq!(partition_for("w1", 10), partition_for("w1", 10));
    }

    #[test]
    fn test_partition_for_stays_in_range() {
        for i in 0..200 {
            let key = format!("wallet-{}", i);
            assert!(partition_for(&key, 7) < 7);
        }
        assert_eq!(partition_for("anything", 1), 0);
        assert_eq!(partition_for("anything", 0), 0);
    }

    #[test]
    fn test_partition_for_spreads_keys() {
        let mut used = std::collections::HashSet::new();
        for i in 0..100 {
            used.insert(partition_for(&format!("wallet-{}", i), 4));
        }
        assert_eq!(used.len(), 4);
    }
}
