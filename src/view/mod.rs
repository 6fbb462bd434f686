//! Materialized View module
//!
//! A read-only replica of a processor's table, rebuilt by tailing the
//! processor's changelog. Each changelog record is the full aggregate for
//! its key, so the view just keeps the latest record per key.

mod error;

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

use crate::codec::Codec;
use crate::event_log::{EventLog, LogError};
use crate::processor::{Fold, ProcessorConfig, StateOf, Table};
use crate::shutdown::Shutdown;

pub use error::ViewError;

/// Replica of the table maintained by fold `F`.
///
/// Cloning is cheap; clones share the same table and readiness flag.
pub struct View<F: Fold> {
    log: Arc<dyn EventLog>,
    config: ProcessorConfig,
    table: Arc<RwLock<Table<StateOf<F>>>>,
    ready: Arc<watch::Sender<bool>>,
    _fold: PhantomData<fn() -> F>,
}

impl<F: Fold> Clone for View<F> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            config: self.config.clone(),
            table: Arc::clone(&self.table),
            ready: Arc::clone(&self.ready),
            _fold: PhantomData,
        }
    }
}

impl<F: Fold> View<F> {
    pub fn new(log: Arc<dyn EventLog>, config: ProcessorConfig) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            log,
            config,
            table: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(ready),
            _fold: PhantomData,
        }
    }

    /// Latest replicated aggregate for `key`
    pub fn get(&self, key: &str) -> Option<StateOf<F>> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the whole table
    pub fn snapshot(&self) -> Table<StateOf<F>> {
        self.table.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// True once the view has replayed everything that was in the
    /// changelog when it started
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // the sender lives as long as `self`
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Tail the changelog until `shutdown` fires.
    pub async fn run(&self, mut shutdown: Shutdown) -> Result<(), ViewError> {
        let topic = F::table();

        let Some(partitions) = self.wait_for_topic(&topic, &mut shutdown).await? else {
            return Ok(());
        };

        let mut targets = Vec::with_capacity(partitions as usize);
        for partition in 0..partitions {
            targets.push(self.log.end_offset(&topic, partition).await?);
        }
        let mut positions = vec![0i64; partitions as usize];

        tracing::info!(topic = %topic, partitions, "Starting view");

        loop {
            let mut progressed = false;

            for partition in 0..partitions {
                let idx = partition as usize;
                let records = self
                    .log
                    .read(&topic, partition, positions[idx], self.config.batch_size)
                    .await?;
                if records.is_empty() {
                    continue;
                }

                let mut decoded = Vec::with_capacity(records.len());
                for record in records {
                    let state = F::State::decode(&record.value).map_err(|source| {
                        tracing::error!(position = %record.position(), "Undecodable changelog record");
                        ViewError::Decode {
                            position: record.position(),
                            source,
                        }
                    })?;
                    positions[idx] = record.offset + 1;
                    decoded.push((record.key, state));
                }

                self.table
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(decoded);
                progressed = true;
            }

            if !self.is_ready() && positions.iter().zip(&targets).all(|(pos, end)| pos >= end) {
                self.ready.send_replace(true);
                tracing::info!(topic = %topic, keys = self.len(), "View caught up");
            }

            if shutdown.is_triggered() {
                break;
            }
            if !progressed {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                    _ = shutdown.wait() => {}
                }
            }
        }

        tracing::info!(topic = %topic, "View stopped");
        Ok(())
    }

    /// Poll until the processor has created its changelog. `None` means
    /// shutdown fired first.
    async fn wait_for_topic(
        &self,
        topic: &str,
        shutdown: &mut Shutdown,
    ) -> Result<Option<u32>, ViewError> {
        let mut logged = false;
        loop {
            match self.log.partitions(topic).await {
                Ok(partitions) => return Ok(Some(partitions)),
                Err(LogError::UnknownTopic(_)) => {
                    if !logged {
                        tracing::info!(topic = %topic, "Waiting for changelog topic");
                        logged = true;
                    }
                }
                Err(e) => return Err(e.into()),
            }

            if shutdown.is_triggered() {
                return Ok(None);
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.wait() => {}
            }
        }
    }
}
