use chrono::Utc;
use sqlx::PgPool;

use crate::error::StoreResult;
use crate::models::CloakLogEntry;

/// Append-only cloak decision log. The decision engine never writes here
/// directly — it pushes entries onto the fast store's drain queue, and a
/// job handler batch-inserts them, the same producer/consumer split the
/// teacher uses to keep the hot request path off the durable store.
pub struct CloakLog<'a> {
    pool: &'a PgPool,
}

impl<'a> CloakLog<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Batch-inserts a drained page of log entries in one round trip.
    /// Returns the number of rows actually inserted.
    pub async fn insert_batch(&self, entries: &[CloakLogEntry]) -> StoreResult<u64> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO cloak_logs (
                    id, user_id, offer_id, ip_address, user_agent, referer, request_url,
                    decision, decision_reason, fraud_score, blocked_at_layer, detection_details,
                    ip_country, ip_city, ip_isp, ip_asn, is_datacenter, is_vpn, is_proxy,
                    processing_time_ms, has_tracking_params, gclid, created_at
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
                )
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(entry.id)
            .bind(entry.user_id)
            .bind(entry.offer_id)
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .bind(&entry.referer)
            .bind(&entry.request_url)
            .bind(entry.decision)
            .bind(&entry.decision_reason)
            .bind(entry.fraud_score)
            .bind(entry.blocked_at_layer)
            .bind(&entry.detection_details)
            .bind(&entry.ip_country)
            .bind(&entry.ip_city)
            .bind(&entry.ip_isp)
            .bind(entry.ip_asn)
            .bind(entry.is_datacenter)
            .bind(entry.is_vpn)
            .bind(entry.is_proxy)
            .bind(entry.processing_time_ms)
            .bind(entry.has_tracking_params)
            .bind(&entry.gclid)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(entries.len() as u64)
    }

    pub async fn list_for_offer(
        &self,
        offer_id: i64,
        limit: i64,
    ) -> StoreResult<Vec<CloakLogEntry>> {
        Ok(sqlx::query_as::<_, CloakLogEntry>(
            "SELECT * FROM cloak_logs WHERE offer_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(offer_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Deletes log rows older than `retention_days` — the scheduler's
    /// retention tick. Returns the number of rows removed.
    pub async fn delete_older_than(&self, retention_days: i64) -> StoreResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(retention_days);
        let result = sqlx::query("DELETE FROM cloak_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
