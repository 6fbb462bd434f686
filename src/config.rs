//! Configuration module
//!
//! Loads configuration from environment variables. Which roles a process
//! plays comes from the command line and is carried by [`Roles`].

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::Direction;
use crate::processor::ProcessorConfig;

/// Storage behind the event log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogBackend {
    /// In-process log; every role must run in the same process
    Memory,
    /// Durable log shared by processes through PostgreSQL
    Postgres,
}

impl FromStr for LogBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(ConfigError::InvalidValue("LOG_BACKEND")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub log_backend: LogBackend,

    /// Database connection URL, required by the postgres backend
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Partition count for every topic this process creates
    pub partitions: u32,

    /// Sleep between polls of an idle partition
    pub poll_interval: Duration,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_backend = var("LOG_BACKEND")
            .unwrap_or_else(|| "memory".to_string())
            .parse()?;

        let database_url = var("DATABASE_URL");
        if log_backend == LogBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let database_max_connections = parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10)?;

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&var, "PORT", 8080)?;

        let partitions: u32 = parse_or(&var, "PARTITIONS", 10)?;
        if partitions == 0 {
            return Err(ConfigError::InvalidValue("PARTITIONS"));
        }

        let poll_interval = Duration::from_millis(parse_or(&var, "POLL_INTERVAL_MS", 100)?);

        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        Ok(Self {
            log_backend,
            database_url,
            database_max_connections,
            host,
            port,
            partitions,
            poll_interval,
            environment,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Runtime settings shared by processors and views
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            partitions: self.partitions,
            poll_interval: self.poll_interval,
            ..ProcessorConfig::default()
        }
    }
}

fn parse_or<F, T>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match var(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue(key)),
        None => Ok(default),
    }
}

/// The roles one process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roles {
    pub run_collector: bool,
    pub run_flagger: bool,
    /// HTTP facade bound to one write stream
    pub service: Option<Direction>,
}

impl Roles {
    pub fn new(
        run_collector: bool,
        run_flagger: bool,
        service: Option<Direction>,
    ) -> Result<Self, ConfigError> {
        if !run_collector && !run_flagger && service.is_none() {
            return Err(ConfigError::NoRoles);
        }
        Ok(Self {
            run_collector,
            run_flagger,
            service,
        })
    }

    /// True when this process alone covers the whole pipeline
    pub fn is_complete(&self) -> bool {
        self.run_collector && self.run_flagger && self.service.is_some()
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),

    #[error("No role selected: pass --collector, --flagger or --service")]
    NoRoles,
}
