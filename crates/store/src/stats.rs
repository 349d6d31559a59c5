use chrono::NaiveDate;
use sqlx::PgPool;

use crate::error::StoreResult;
use crate::models::DailyStatRow;

/// Per-`(userId, offerId, date)` rollups, refreshed by the scheduler's
/// aggregation tick from `cloak_logs`. Upserts by primary key so a
/// re-run for the same day recomputes rather than double-counts.
pub struct Stats<'a> {
    pool: &'a PgPool,
}

impl<'a> Stats<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Recomputes and upserts the daily_stats row for `date`, aggregating
    /// straight from `cloak_logs`. Called once per `(user_id, offer_id)`
    /// pair that logged traffic that day.
    pub async fn recompute_for_day(
        &self,
        user_id: i64,
        offer_id: i64,
        date: NaiveDate,
    ) -> StoreResult<DailyStatRow> {
        sqlx::query_as::<_, DailyStatRow>(
            r#"
            INSERT INTO daily_stats (
                user_id, offer_id, stat_date, total_visits, money_page_visits,
                safe_page_visits, unique_ips, avg_fraud_score,
                blocked_l1, blocked_l2, blocked_l3, blocked_l4, blocked_l5, blocked_timeout,
                updated_at
            )
            SELECT
                $1, $2, $3,
                count(*),
                count(*) FILTER (WHERE decision = 'money'),
                count(*) FILTER (WHERE decision = 'safe'),
                count(DISTINCT ip_address),
                COALESCE(avg(fraud_score), 0),
                count(*) FILTER (WHERE blocked_at_layer = 'l1'),
                count(*) FILTER (WHERE blocked_at_layer = 'l2'),
                count(*) FILTER (WHERE blocked_at_layer = 'l3'),
                count(*) FILTER (WHERE blocked_at_layer = 'l4'),
                count(*) FILTER (WHERE blocked_at_layer = 'l5'),
                count(*) FILTER (WHERE blocked_at_layer = 'timeout'),
                now()
            FROM cloak_logs
            WHERE user_id = $1 AND offer_id = $2
              AND created_at >= $3::date AND created_at < ($3::date + interval '1 day')
            ON CONFLICT (user_id, offer_id, stat_date) DO UPDATE SET
                total_visits = excluded.total_visits,
                money_page_visits = excluded.money_page_visits,
                safe_page_visits = excluded.safe_page_visits,
                unique_ips = excluded.unique_ips,
                avg_fraud_score = excluded.avg_fraud_score,
                blocked_l1 = excluded.blocked_l1,
                blocked_l2 = excluded.blocked_l2,
                blocked_l3 = excluded.blocked_l3,
                blocked_l4 = excluded.blocked_l4,
                blocked_l5 = excluded.blocked_l5,
                blocked_timeout = excluded.blocked_timeout,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(offer_id)
        .bind(date)
        .fetch_one(self.pool)
        .await
        .map_err(crate::error::StoreError::from)
    }

    /// Distinct `(user_id, offer_id)` pairs with log activity on `date` —
    /// feeds the scheduler's fan-out over `recompute_for_day`.
    pub async fn active_pairs_for_day(
        &self,
        date: NaiveDate,
    ) -> StoreResult<Vec<(i64, i64)>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT DISTINCT user_id, offer_id FROM cloak_logs
            WHERE created_at >= $1::date AND created_at < ($1::date + interval '1 day')
            "#,
        )
        .bind(date)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_for_offer(
        &self,
        offer_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<DailyStatRow>> {
        Ok(sqlx::query_as::<_, DailyStatRow>(
            "SELECT * FROM daily_stats WHERE offer_id = $1 AND stat_date BETWEEN $2 AND $3 \
             ORDER BY stat_date ASC",
        )
        .bind(offer_id)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?)
    }
}
