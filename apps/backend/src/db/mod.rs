//! PostgreSQL database operations

use std::collections::HashMap;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::Result;
use crate::models::{CloudSyncRecord, ProgressRow};

const UPSERT_PROGRESS: &str = r#"
    INSERT INTO cloud_progress (device_id, card_id, "interval", ease_factor, next_review, reps, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, NOW())
    ON CONFLICT (device_id, card_id) DO UPDATE
    SET "interval" = EXCLUDED."interval",
        ease_factor = EXCLUDED.ease_factor,
        next_review = EXCLUDED.next_review,
        reps = EXCLUDED.reps,
        updated_at = NOW()
"#;

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // === Progress Repository ===

    /// All rows stored under a device
    pub async fn get_progress(&self, device_id: &str) -> Result<Vec<ProgressRow>> {
        let rows = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT device_id, card_id, "interval", ease_factor, next_review, reps, updated_at
            FROM cloud_progress
            WHERE device_id = $1
            ORDER BY card_id
            "#,
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Upsert many rows in one transaction, keyed on (device_id, card_id)
    pub async fn upsert_progress(
        &self,
        device_id: &str,
        records: &HashMap<i64, CloudSyncRecord>,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut upserted = 0;

        for (&card_id, record) in records {
            upserted += bind_record(sqlx::query(UPSERT_PROGRESS), device_id, card_id, record)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(upserted)
    }

    /// Upsert a single row
    pub async fn upsert_one(
        &self,
        device_id: &str,
        card_id: i64,
        record: &CloudSyncRecord,
    ) -> Result<u64> {
        let result = bind_record(sqlx::query(UPSERT_PROGRESS), device_id, card_id, record)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every row for a device
    pub async fn delete_progress(&self, device_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cloud_progress WHERE device_id = $1")
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

/// Counters were range-checked during validation.
fn bind_record<'q>(
    query: PgQuery<'q>,
    device_id: &'q str,
    card_id: i64,
    record: &CloudSyncRecord,
) -> PgQuery<'q> {
    query
        .bind(device_id)
        .bind(card_id)
        .bind(i32::try_from(record.interval).unwrap_or(i32::MAX))
        .bind(record.ease_factor)
        .bind(record.next_review)
        .bind(i32::try_from(record.reps).unwrap_or(i32::MAX))
}
