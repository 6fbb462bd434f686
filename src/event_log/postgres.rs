//! PostgreSQL-backed event log
//!
//! Each topic partition owns a row in `log_partitions` holding its next
//! offset. Appends lock that row, so offsets within a partition are dense
//! and ordered by commit. Records live in `log_records`, consumer group
//! positions in `consumer_offsets`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{EventLog, LogError, LogPosition, LogRecord};

/// Event log stored in PostgreSQL
#[derive(Debug, Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    /// Create a new PgEventLog with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn check_partition(&self, topic: &str, partition: u32) -> Result<(), LogError> {
        let partitions = self.partitions(topic).await?;
        if partition >= partitions {
            return Err(LogError::PartitionOutOfRange {
                topic: topic.to_string(),
                partition,
                partitions,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EventLog for PgEventLog {
    async fn ensure_topic(&self, topic: &str, partitions: u32) -> Result<(), LogError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM log_partitions WHERE topic = $1",
        )
        .bind(topic)
        .fetch_one(&mut *tx)
        .await?;

        if existing == 0 {
            for partition in 0..partitions {
                sqlx::query(
                    r#"
                    INSERT INTO log_partitions (topic, partition_id, next_offset)
                    VALUES ($1, $2, 0)
                    ON CONFLICT (topic, partition_id) DO NOTHING
                    "#,
                )
                .bind(topic)
                .bind(partition as i32)
                .execute(&mut *tx)
                .await?;
            }
            tracing::info!(topic = %topic, partitions, "Created topic");
        } else if existing != i64::from(partitions) {
            return Err(LogError::PartitionMismatch {
                topic: topic.to_string(),
                existing: existing as u32,
                requested: partitions,
            });
        }

        tx.commit().await?;
        Ok(())
    }

    async fn partitions(&self, topic: &str) -> Result<u32, LogError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM log_partitions WHERE topic = $1",
        )
        .bind(topic)
        .fetch_one(&self.pool)
        .await?;

        if count == 0 {
            return Err(LogError::UnknownTopic(topic.to_string()));
        }
        Ok(count as u32)
    }

    async fn append(
        &self,
        topic: &str,
        partition: u32,
        key: &str,
        value: Vec<u8>,
    ) -> Result<LogPosition, LogError> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the partition serialises concurrent appenders
        let offset: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE log_partitions
            SET next_offset = next_offset + 1
            WHERE topic = $1 AND partition_id = $2
            RETURNING next_offset - 1
            "#,
        )
        .bind(topic)
        .bind(partition as i32)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(offset) = offset else {
            tx.rollback().await?;
            self.check_partition(topic, partition).await?;
            return Err(LogError::UnknownTopic(topic.to_string()));
        };

        sqlx::query(
            r#"
            INSERT INTO log_records (topic, partition_id, record_offset, record_key, record_value)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(topic)
        .bind(partition as i32)
        .bind(offset)
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

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
        let rows: Vec<(i64, String, Vec<u8>, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT record_offset, record_key, record_value, appended_at
            FROM log_records
            WHERE topic = $1 AND partition_id = $2 AND record_offset >= $3
            ORDER BY record_offset ASC
            LIMIT $4
            "#,
        )
        .bind(topic)
        .bind(partition as i32)
        .bind(from)
        .bind(max as i64)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            self.check_partition(topic, partition).await?;
        }

        Ok(rows
            .into_iter()
            .map(|(offset, key, value, appended_at)| LogRecord {
                topic: topic.to_string(),
                partition,
                offset,
                key,
                value,
                appended_at,
            })
            .collect())
    }

    async fn end_offset(&self, topic: &str, partition: u32) -> Result<i64, LogError> {
        let next: Option<i64> = sqlx::query_scalar(
            "SELECT next_offset FROM log_partitions WHERE topic = $1 AND partition_id = $2",
        )
        .bind(topic)
        .bind(partition as i32)
        .fetch_optional(&self.pool)
        .await?;

        match next {
            Some(next) => Ok(next),
            None => {
                self.check_partition(topic, partition).await?;
                Err(LogError::UnknownTopic(topic.to_string()))
            }
        }
    }

    async fn committed(
        &self,
        group: &str,
        topic: &str,
        partition: u32,
    ) -> Result<Option<i64>, LogError> {
        let offset: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT committed_offset FROM consumer_offsets
            WHERE group_id = $1 AND topic = $2 AND partition_id = $3
            "#,
        )
        .bind(group)
        .bind(topic)
        .bind(partition as i32)
        .fetch_optional(&self.pool)
        .await?;

        Ok(offset)
    }

    async fn commit(
        &self,
        group: &str,
        topic: &str,
        partition: u32,
        offset: i64,
    ) -> Result<(), LogError> {
        sqlx::query(
            r#"
            INSERT INTO consumer_offsets (group_id, topic, partition_id, committed_offset)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (group_id, topic, partition_id)
            DO UPDATE SET committed_offset = EXCLUDED.committed_offset, updated_at = NOW()
            "#,
        )
        .bind(group)
        .bind(topic)
        .bind(partition as i32)
        .bind(offset)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
