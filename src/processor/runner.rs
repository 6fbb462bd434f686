//! Processor runtime
//!
//! One sequential loop per partition. Keys are routed to exactly one
//! partition, so each loop owns its keys outright and its store needs no
//! locking. For every input record a loop:
//!
//! 1. decodes the event,
//! 2. folds it into the key's current aggregate,
//! 3. stores the new aggregate locally,
//! 4. appends the aggregate to the changelog,
//! 5. commits `offset + 1` for the input partition.
//!
//! The commit always comes last: a crash before it replays the record on
//! restart, a crash after it never loses a changelog entry.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::codec::Codec;
use crate::event_log::{EventLog, LogError, LogRecord};
use crate::shutdown::Shutdown;

use super::{Fold, ProcessorError, StateOf, Table};

/// Attempts for a single log call before the partition gives up
const MAX_ATTEMPTS: u32 = 3;

/// Runtime settings shared by processors and views
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Partition count of every topic the processor touches
    pub partitions: u32,

    /// Sleep between polls of an idle partition
    pub poll_interval: Duration,

    /// Maximum records fetched per read
    pub batch_size: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            partitions: 10,
            poll_interval: Duration::from_millis(100),
            batch_size: 100,
        }
    }
}

/// Runs fold `F` over its input topics
pub struct Processor<F: Fold> {
    log: Arc<dyn EventLog>,
    config: ProcessorConfig,
    _fold: PhantomData<fn() -> F>,
}

impl<F: Fold> Processor<F> {
    pub fn new(log: Arc<dyn EventLog>, config: ProcessorConfig) -> Self {
        Self {
            log,
            config,
            _fold: PhantomData,
        }
    }

    /// Run until `shutdown` fires or a partition fails.
    ///
    /// Returns the merged table of all partitions on clean shutdown. The
    /// first partition failure stops the remaining partitions and is
    /// returned.
    pub async fn run(&self, shutdown: Shutdown) -> Result<Table<StateOf<F>>, ProcessorError> {
        self.ensure_topics().await?;

        tracing::info!(
            group = F::GROUP,
            inputs = ?F::INPUTS,
            partitions = self.config.partitions,
            "Starting processor"
        );

        let (stop, local) = shutdown.child();
        let mut tasks = JoinSet::new();

        for partition in 0..self.config.partitions {
            let store = self.recover(partition).await?;
            let worker = PartitionLoop::<F> {
                log: Arc::clone(&self.log),
                config: self.config.clone(),
                partition,
                store,
                shutdown: local.clone(),
                _fold: PhantomData,
            };
            tasks.spawn(worker.run());
        }

        let mut table = Table::new();
        let mut failure: Option<ProcessorError> = None;

        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(ProcessorError::Task(e.to_string())));
            match result {
                Ok(store) => table.extend(store),
                Err(e) => {
                    tracing::error!(group = F::GROUP, error = %e, "Partition stopped with error");
                    stop.trigger();
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => {
                tracing::info!(group = F::GROUP, keys = table.len(), "Processor stopped");
                Ok(table)
            }
        }
    }

    /// Rebuild one partition's store from the changelog.
    pub async fn recover(&self, partition: u32) -> Result<Table<StateOf<F>>, ProcessorError> {
        let topic = F::table();
        let end = self.log.end_offset(&topic, partition).await?;

        let mut store = Table::new();
        let mut next = 0;
        while next < end {
            let records = self
                .log
                .read(&topic, partition, next, self.config.batch_size)
                .await?;
            if records.is_empty() {
                break;
            }
            for record in records {
                let state = F::State::decode(&record.value).map_err(|source| {
                    ProcessorError::Decode {
                        position: record.position(),
                        source,
                    }
                })?;
                next = record.offset + 1;
                store.insert(record.key, state);
            }
        }

        tracing::debug!(
            group = F::GROUP,
            partition,
            keys = store.len(),
            replayed = next,
            "Restored partition from changelog"
        );

        Ok(store)
    }

    async fn ensure_topics(&self) -> Result<(), LogError> {
        for input in F::INPUTS {
            self.log.ensure_topic(input, self.config.partitions).await?;
        }
        self.log
            .ensure_topic(&F::table(), self.config.partitions)
            .await
    }
}

/// Owns one partition's keys for the lifetime of a run
struct PartitionLoop<F: Fold> {
    log: Arc<dyn EventLog>,
    config: ProcessorConfig,
    partition: u32,
    store: Table<StateOf<F>>,
    shutdown: Shutdown,
    _fold: PhantomData<fn() -> F>,
}

impl<F: Fold> PartitionLoop<F> {
    async fn run(mut self) -> Result<Table<StateOf<F>>, ProcessorError> {
        let mut positions = Vec::with_capacity(F::INPUTS.len());
        for input in F::INPUTS {
            let committed = retry(|| self.log.committed(F::GROUP, input, self.partition)).await?;
            positions.push(committed.unwrap_or(0));
        }

        tracing::debug!(
            group = F::GROUP,
            partition = self.partition,
            positions = ?positions,
            "Partition loop started"
        );

        'poll: loop {
            let mut progressed = false;

            for (input, position) in F::INPUTS.iter().zip(positions.iter_mut()) {
                let records = retry(|| {
                    self.log
                        .read(input, self.partition, *position, self.config.batch_size)
                })
                .await?;

                for record in records {
                    if self.shutdown.is_triggered() {
                        break 'poll;
                    }
                    self.process(&record).await?;
                    *position = record.offset + 1;
                    progressed = true;
                }
            }

            if self.shutdown.is_triggered() {
                break;
            }
            if !progressed {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                    _ = self.shutdown.wait() => {}
                }
            }
        }

        tracing::debug!(
            group = F::GROUP,
            partition = self.partition,
            keys = self.store.len(),
            "Partition loop stopped"
        );

        Ok(self.store)
    }

    async fn process(&mut self, record: &LogRecord) -> Result<(), ProcessorError> {
        let event = F::Event::decode(&record.value).map_err(|source| {
            tracing::error!(group = F::GROUP, position = %record.position(), "Undecodable event");
            ProcessorError::Decode {
                position: record.position(),
                source,
            }
        })?;

        let current = self.store.get(&record.key).cloned();
        let next = F::fold(&record.key, current, event).map_err(|source| {
            tracing::error!(group = F::GROUP, position = %record.position(), "Fold rejected event");
            ProcessorError::Fold {
                position: record.position(),
                source,
            }
        })?;

        let snapshot = F::State::encode(&next);
        self.store.insert(record.key.clone(), next);

        let table = F::table();
        retry(|| {
            self.log
                .append(&table, self.partition, &record.key, snapshot.clone())
        })
        .await?;
        retry(|| {
            self.log
                .commit(F::GROUP, &record.topic, self.partition, record.offset + 1)
        })
        .await?;

        tracing::trace!(group = F::GROUP, position = %record.position(), key = %record.key, "Folded event");
        Ok(())
    }
}

/// Retry transient log errors with exponential backoff
async fn retry<T, Fut>(mut op: impl FnMut() -> Fut) -> Result<T, LogError>
where
    Fut: Future<Output = Result<T, LogError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                let delay = Duration::from_millis(50 * 2u64.pow(attempt));
                attempt += 1;
                tracing::warn!(
                    error = %e,
                    "Event log call failed, retrying (attempt {}/{})",
                    attempt,
                    MAX_ATTEMPTS
                );
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}
