//! Emitter
//!
//! Write-path client: encodes a value, routes it by key and returns only
//! after the log acknowledged the append. Errors from the log are handed
//! back untouched; retrying is the caller's decision.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::codec::Codec;
use crate::event_log::{partition_for, EventLog, LogError, LogPosition};

/// Publishes `C::Value`s to one topic
pub struct Emitter<C: Codec> {
    log: Arc<dyn EventLog>,
    topic: String,
    partitions: u32,
    _codec: PhantomData<fn() -> C>,
}

impl<C: Codec> Clone for Emitter<C> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            topic: self.topic.clone(),
            partitions: self.partitions,
            _codec: PhantomData,
        }
    }
}

impl<C: Codec> Emitter<C> {
    /// Create an emitter, creating the topic if it does not exist yet
    pub async fn new(
        log: Arc<dyn EventLog>,
        topic: impl Into<String>,
        partitions: u32,
    ) -> Result<Self, LogError> {
        let topic = topic.into();
        log.ensure_topic(&topic, partitions).await?;
        Ok(Self {
            log,
            topic,
            partitions,
            _codec: PhantomData,
        })
    }

    /// Append `value` under `key` and wait for the acknowledgment
    pub async fn send(&self, key: &str, value: &C::Value) -> Result<LogPosition, LogError> {
        let partition = partition_for(key, self.partitions);
        self.log
            .append(&self.topic, partition, key, C::encode(value))
            .await
    }
}
