//! Database module
//!
//! Schema migrations and verification for the PostgreSQL event log.

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::PgPool;

/// Embedded migrations under `migrations/`
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Tables `PgEventLog` needs
const REQUIRED_TABLES: &[&str] = &["log_partitions", "log_records", "consumer_offsets"];

/// Verify database connectivity
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Run the embedded SQL migrations.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded_in_order() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();

        assert_eq!(versions, vec![1]);
        assert_eq!(MIGRATOR.iter().next().unwrap().description, "event log");
    }

    #[test]
    fn test_event_log_migration_creates_required_tables() {
        let sql = &MIGRATOR.iter().next().unwrap().sql;

        for table in REQUIRED_TABLES {
            assert!(sql.contains(&format!("CREATE TABLE IF NOT EXISTS {}", table)));
        }
    }
}
