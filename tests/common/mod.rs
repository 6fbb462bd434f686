//! Common test utilities
#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::task::JoinHandle;

use depositaja::api::{self, AppState};
use depositaja::codec::DepositCodec;
use depositaja::emitter::Emitter;
use depositaja::event_log::{EventLog, LogError, LogPosition, LogRecord, MemoryLog};
use depositaja::handlers::{CheckHandler, DepositHandler};
use depositaja::processor::{BalanceCollector, Flagger, Processor, ProcessorConfig};
use depositaja::shutdown::{self, ShutdownTrigger};
use depositaja::view::View;
use depositaja::Direction;

pub const PARTITIONS: u32 = 4;

pub fn processor_config() -> ProcessorConfig {
    ProcessorConfig {
        partitions: PARTITIONS,
        poll_interval: Duration::from_millis(5),
        batch_size: 16,
    }
}

/// Collector, flagger and both views running on one log
pub struct Pipeline {
    pub log: Arc<MemoryLog>,
    pub balances: View<BalanceCollector>,
    pub flags: View<Flagger>,
    trigger: ShutdownTrigger,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    pub async fn start() -> Self {
        Self::start_on(Arc::new(MemoryLog::new())).await
    }

    pub async fn start_on(log: Arc<MemoryLog>) -> Self {
        let config = processor_config();
        let (trigger, signal) = shutdown::channel();
        let mut tasks = Vec::new();

        let collector = Processor::<BalanceCollector>::new(log.clone(), config.clone());
        let s = signal.clone();
        tasks.push(tokio::spawn(async move {
            collector.run(s).await.expect("collector failed");
        }));

        let flagger = Processor::<Flagger>::new(log.clone(), config.clone());
        let s = signal.clone();
        tasks.push(tokio::spawn(async move {
            flagger.run(s).await.expect("flagger failed");
        }));

        let balances = View::<BalanceCollector>::new(log.clone(), config.clone());
        let flags = View::<Flagger>::new(log.clone(), config);

        let (view, s) = (balances.clone(), signal.clone());
        tasks.push(tokio::spawn(async move {
            view.run(s).await.expect("balance view failed");
        }));
        let (view, s) = (flags.clone(), signal);
        tasks.push(tokio::spawn(async move {
            view.run(s).await.expect("flag view failed");
        }));

        let pipeline = Self {
            log,
            balances,
            flags,
            trigger,
            tasks,
        };

        tokio::time::timeout(Duration::from_secs(5), async {
            pipeline.balances.wait_ready().await;
            pipeline.flags.wait_ready().await;
        })
        .await
        .expect("views did not become ready");

        pipeline
    }

    pub async fn emitter(&self, topic: &str) -> Emitter<DepositCodec> {
        Emitter::new(self.log.clone(), topic, PARTITIONS).await.unwrap()
    }

    pub async fn app(&self, direction: Direction) -> Router {
        let emitter = self.emitter(direction.stream()).await;
        api::build_router(AppState::new(
            DepositHandler::new(emitter, direction),
            CheckHandler::new(self.balances.clone(), self.flags.clone()),
        ))
    }

    /// Stop everything and wait until every loop has exited
    pub async fn stop(self) -> Arc<MemoryLog> {
        self.trigger.trigger();
        for task in self.tasks {
            task.await.unwrap();
        }
        self.log
    }
}

/// Poll `condition` until it holds or five seconds pass
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// A log whose appends always fail
pub struct FailingLog;

#[async_trait]
impl EventLog for FailingLog {
    async fn ensure_topic(&self, _topic: &str, _partitions: u32) -> Result<(), LogError> {
        Ok(())
    }

    async fn partitions(&self, _topic: &str) -> Result<u32, LogError> {
        Ok(PARTITIONS)
    }

    async fn append(
        &self,
        _topic: &str,
        _partition: u32,
        _key: &str,
        _value: Vec<u8>,
    ) -> Result<LogPosition, LogError> {
        Err(LogError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn read(
        &self,
        _topic: &str,
        _partition: u32,
        _from: i64,
        _max: usize,
    ) -> Result<Vec<LogRecord>, LogError> {
        Ok(Vec::new())
    }

    async fn end_offset(&self, _topic: &str, _partition: u32) -> Result<i64, LogError> {
        Ok(0)
    }

    async fn committed(
        &self,
        _group: &str,
        _topic: &str,
        _partition: u32,
    ) -> Result<Option<i64>, LogError> {
        Ok(None)
    }

    async fn commit(
        &self,
        _group: &str,
        _topic: &str,
        _partition: u32,
        _offset: i64,
    ) -> Result<(), LogError> {
        Ok(())
    }
}

/// Connect to `DATABASE_URL` and make sure the event log schema exists
pub async fn setup_test_db() -> sqlx::PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    depositaja::db::ensure_schema(&pool)
        .await
        .expect("Failed to create event log schema");

    pool
}

/// Topic name no other test run uses
pub fn unique_topic(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}
