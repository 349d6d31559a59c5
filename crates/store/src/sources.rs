use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};
use crate::models::{BlacklistSourceRow, SyncStatus, UpdateFrequency};

/// External/community blacklist feed records. Sync bookkeeping lives
/// here; the actual rule rows land in the five `blacklist_*` tables via
/// [`crate::blacklist::Blacklist`], tagged with `source = "source:<id>"`.
pub struct Sources<'a> {
    pool: &'a PgPool,
}

impl<'a> Sources<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> StoreResult<BlacklistSourceRow> {
        sqlx::query_as::<_, BlacklistSourceRow>("SELECT * FROM blacklist_sources WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("blacklist source {id}")))
    }

    pub async fn list_active(&self) -> StoreResult<Vec<BlacklistSourceRow>> {
        Ok(sqlx::query_as::<_, BlacklistSourceRow>(
            "SELECT * FROM blacklist_sources WHERE is_active = true",
        )
        .fetch_all(self.pool)
        .await?)
    }

    /// Sources whose `next_sync_at` has passed (or was never set) — what
    /// the scheduler's external-source tick polls.
    pub async fn list_due(&self) -> StoreResult<Vec<BlacklistSourceRow>> {
        Ok(sqlx::query_as::<_, BlacklistSourceRow>(
            "SELECT * FROM blacklist_sources WHERE is_active = true \
             AND (next_sync_at IS NULL OR next_sync_at <= now())",
        )
        .fetch_all(self.pool)
        .await?)
    }

    pub fn source_tag(id: i64) -> String {
        format!("source:{id}")
    }

    pub async fn mark_syncing(&self, id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE blacklist_sources SET sync_status = 'syncing' WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_synced(
        &self,
        id: i64,
        next_sync_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE blacklist_sources SET
                sync_status = 'success', sync_error = NULL,
                last_sync_at = now(), next_sync_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(next_sync_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_sync_failed(&self, id: i64, error: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE blacklist_sources SET
                sync_status = 'failed', sync_error = $2, last_sync_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Next due time for a cadence, anchored at `from` — a plain
    /// calendar step, not a cron expression, matching the three
    /// frequencies the data model allows.
    pub fn next_due_at(frequency: UpdateFrequency, from: DateTime<Utc>) -> DateTime<Utc> {
        match frequency {
            UpdateFrequency::Daily => from + chrono::Duration::days(1),
            UpdateFrequency::Weekly => from + chrono::Duration::weeks(1),
            UpdateFrequency::Monthly => from + chrono::Duration::days(30),
        }
    }

    pub async fn set_active(&self, id: i64, active: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE blacklist_sources SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("blacklist source {id}")));
        }
        Ok(())
    }

    pub fn is_stale(row: &BlacklistSourceRow) -> bool {
        matches!(row.sync_status, Some(SyncStatus::Failed) | None)
    }
}
