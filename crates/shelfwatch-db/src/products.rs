//! Row-level product history: the append/read-back boundary used for
//! display, with a Postgres implementation over `product_history`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shelfwatch_core::ProductRecord;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `product_history` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ProductHistoryRow {
    pub id: i64,
    pub run_id: Uuid,
    pub report_name: String,
    pub product_name: String,
    /// Stored as `NUMERIC(12,2)`.
    pub price: Decimal,
    pub seller: String,
    pub weight: String,
    /// `"Dog"`, `"Cat"` or `"N/A"`.
    pub pet: String,
    pub source_url: String,
    pub run_at: DateTime<Utc>,
}

/// Identifies the run a batch of rows belongs to.
#[derive(Debug, Clone, Copy)]
pub struct RunStamp<'a> {
    pub run_id: Uuid,
    pub report_name: &'a str,
    pub run_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Store boundary
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Appends one row per record. Returns the number of rows written.
    async fn append_rows(
        &self,
        stamp: RunStamp<'_>,
        records: &[ProductRecord],
    ) -> Result<u64, DbError>;

    /// Most recent rows first, at most `limit`.
    async fn recent_rows(&self, limit: i64) -> Result<Vec<ProductHistoryRow>, DbError>;
}

#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    /// All rows of a run are written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if any insert fails; nothing is committed.
    async fn append_rows(
        &self,
        stamp: RunStamp<'_>,
        records: &[ProductRecord],
    ) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for record in records {
            let result = sqlx::query(
                "INSERT INTO product_history \
                     (run_id, report_name, product_name, price, seller, weight, pet, \
                      source_url, run_at) \
                 VALUES ($1, $2, $3, $4::numeric(12,2), $5, $6, $7, $8, $9)",
            )
            .bind(stamp.run_id)
            .bind(stamp.report_name)
            .bind(&record.name)
            .bind(record.price)
            .bind(&record.seller)
            .bind(&record.weight)
            .bind(record.pet_category.to_string())
            .bind(&record.source_url)
            .bind(stamp.run_at)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        tracing::debug!(report = stamp.report_name, rows = written, "appended product history rows");
        Ok(written)
    }

    /// Ordered by `run_at DESC, id DESC` so rows of one run stay together.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    async fn recent_rows(&self, limit: i64) -> Result<Vec<ProductHistoryRow>, DbError> {
        let rows = sqlx::query_as::<_, ProductHistoryRow>(
            "SELECT id, run_id, report_name, product_name, price, seller, weight, pet, \
                    source_url, run_at \
             FROM product_history \
             ORDER BY run_at DESC, id DESC \
             LIMIT $1",
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
