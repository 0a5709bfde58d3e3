use crate::core::config::DatabaseConfig;
use sqlx::migrate::Migrator;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Reversible migrations embedded at compile time (`<timestamp>_<name>.{up,down}.sql`)
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(&config.url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::migrate::MigrationType;

    /// Snapshot of the public schema: every column with its type, nullability and default,
    /// plus every constraint and index. `_sqlx_migrations` is bookkeeping and left out.
    async fn schema_snapshot(pool: &PgPool) -> Vec<String> {
        let columns: Vec<(String, String, String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT table_name::text, column_name::text, data_type::text,
                   is_nullable::text, column_default::text
            FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name <> '_sqlx_migrations'
            "#,
        )
        .fetch_all(pool)
        .await
        .unwrap();

        let constraints: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT conrelid::regclass::text, pg_get_constraintdef(oid)
            FROM pg_constraint
            WHERE connamespace = 'public'::regnamespace
              AND conrelid::regclass::text <> '_sqlx_migrations'
            "#,
        )
        .fetch_all(pool)
        .await
        .unwrap();

        let indexes: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT indexdef FROM pg_indexes
            WHERE schemaname = 'public' AND tablename <> '_sqlx_migrations'
            "#,
        )
        .fetch_all(pool)
        .await
        .unwrap();

        let mut snapshot: Vec<String> = columns
            .into_iter()
            .map(|(t, c, ty, null, default)| format!("col {t}.{c} {ty} {null} {default:?}"))
            .chain(constraints.into_iter().map(|(t, def)| format!("con {t} {def}")))
            .chain(indexes.into_iter().map(|(def,)| format!("idx {def}")))
            .collect();
        snapshot.sort();
        snapshot
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_each_migration_down_restores_schema(pool: PgPool) {
        let ups = MIGRATOR
            .iter()
            .filter(|m| m.migration_type == MigrationType::ReversibleUp);

        for up in ups {
            let down = MIGRATOR
                .iter()
                .find(|m| m.version == up.version && m.migration_type == MigrationType::ReversibleDown)
                .unwrap_or_else(|| panic!("migration {} has no down script", up.version));

            let before = schema_snapshot(&pool).await;
            sqlx::raw_sql(&up.sql).execute(&pool).await.unwrap();
            sqlx::raw_sql(&down.sql).execute(&pool).await.unwrap();
            let after = schema_snapshot(&pool).await;

            assert_eq!(before, after, "migration {} is not reversible", up.description);

            // Re-apply so the next migration runs on top of it
            sqlx::raw_sql(&up.sql).execute(&pool).await.unwrap();
        }
    }
}
