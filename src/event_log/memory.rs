//! In-process event log
//!
//! Keeps every partition as a `Vec` of records. Suitable for a single-process
//! deployment where all roles share one log, and for tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use super::{EventLog, LogError, LogPosition, LogRecord};

type OffsetKey = (String, String, u32);

/// Event log held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    topics: RwLock<HashMap<String, Vec<Vec<LogRecord>>>>,
    offsets: Mutex<HashMap<OffsetKey, i64>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against one partition, validating topic and index.
    fn with_partition<T>(
        &self,
        topic: &str,
        partition: u32,
        f: impl FnOnce(&[LogRecord]) -> T,
    ) -> Result<T, LogError> {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        let partitions = topics
            .get(topic)
            .ok_or_else(|| LogError::UnknownTopic(topic.to_string()))?;
        let records = partitions
            .get(partition as usize)
            .ok_or_else(|| out_of_range(topic, partition, partitions.len()))?;
        Ok(f(records))
    }
}

fn out_of_range(topic: &str, partition: u32, partitions: usize) -> LogError {
    LogError::PartitionOutOfRange {
        topic: topic.to_string(),
        partition,
        partitions: partitions as u32,
    }
}

#[async_trait]
impl EventLog for MemoryLog {
    async fn ensure_topic(&self, topic: &str, partitions: u32) -> Result<(), LogError> {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        match topics.get(topic) {
            Some(existing) if existing.len() as u32 != partitions => Err(LogError::PartitionMismatch {
                topic: topic.to_string(),
                existing: existing.len() as u32,
                requested: partitions,
            }),
            Some(_) => Ok(()),
            None => {
                topics.insert(topic.to_string(), vec![Vec::new(); partitions as usize]);
                tracing::debug!(topic = %topic, partitions, "Created topic");
                Ok(())
            }
        }
    }

    async fn partitions(&self, topic: &str) -> Result<u32, LogError> {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        topics
            .get(topic)
            .map(|p| p.len() as u32)
            .ok_or_else(|| LogError::UnknownTopic(topic.to_string()))
    }

    async fn append(
        &self,
        topic: &str,
        partition: u32,
        key: &str,
        value: Vec<u8>,
    ) -> Result<LogPosition, LogError> {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        let partitions = topics
            .get_mut(topic)
            .ok_or_else(|| LogError::UnknownTopic(topic.to_string()))?;
        let count = partitions.len();
        let records = partitions
            .get_mut(partition as usize)
            .ok_or_else(|| out_of_range(topic, partition, count))?;

        let offset = records.len() as i64;
        records.push(LogRecord {
            topic: topic.to_string(),
            partition,
            offset,
            key: key.to_string(),
            value,
            appended_at: Utc::now(),
        });

        Ok(LogPosition {
            topic: topic.to_string(),
            partition,
            offset,
        })
    }

    async fn read(
        &self,
        topic: &str,
        partition: u32,
        from: i64,
        max: usize,
    ) -> Result<Vec<LogRecord>, LogError> {
        self.with_partition(topic, partition, |records| {
            let start = (from.max(0) as usize).min(records.len());
            records[start..].iter().take(max).cloned().collect()
        })
    }

    async fn end_offset(&self, topic: &str, partition: u32) -> Result<i64, LogError> {
        self.with_partition(topic, partition, |records| records.len() as i64)
    }

    async fn committed(
        &self,
        group: &str,
        topic: &str,
        partition: u32,
    ) -> Result<Option<i64>, LogError> {
        let offsets = self.offsets.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(offsets
            .get(&(group.to_string(), topic.to_string(), partition))
            .copied())
    }

    async fn commit(
        &self,
        group: &str,
        topic: &str,
        partition: u32,
        offset: i64,
    ) -> Result<(), LogError> {
        self.with_partition(topic, partition, |_| ())?;
        let mut offsets = self.offsets.lock().unwrap_or_else(PoisonError::into_inner);
        offsets.insert((group.to_string(), topic.to_string(), partition), offset);
        Ok(())
    }
}
