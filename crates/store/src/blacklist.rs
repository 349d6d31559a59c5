use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    BlacklistGeoRow, BlacklistIpRangeRow, BlacklistIpRow, BlacklistIspRow, BlacklistUaRow,
    GeoBlockType, UaPatternType,
};

/// Blacklist rule CRUD, one method family per rule family (IP, CIDR, UA,
/// ISP, Geo). `list_effective_*` returns every row across every scope —
/// the materializer partitions by `user_id` itself, per the spec's
/// per-family rebuild algorithm.
pub struct Blacklist<'a> {
    pool: &'a PgPool,
}

impl<'a> Blacklist<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // ---- IP ----------------------------------------------------------

    pub async fn list_effective_ips(&self) -> StoreResult<Vec<BlacklistIpRow>> {
        Ok(sqlx::query_as::<_, BlacklistIpRow>(
            "SELECT * FROM blacklist_ips WHERE is_active = true \
             AND (expires_at IS NULL OR expires_at > now())",
        )
        .fetch_all(self.pool)
        .await?)
    }

    pub async fn add_ip(
        &self,
        user_id: Option<i64>,
        ip_address: &str,
        source: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<BlacklistIpRow> {
        sqlx::query_as::<_, BlacklistIpRow>(
            r#"
            INSERT INTO blacklist_ips (user_id, ip_address, is_active, source, expires_at)
            VALUES ($1, $2, true, $3, $4)
            ON CONFLICT (user_id, ip_address) DO UPDATE SET
                is_active = true, source = excluded.source, expires_at = excluded.expires_at,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(ip_address)
        .bind(source)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(StoreError::from)
    }

    pub async fn deactivate_ip(&self, id: i64) -> StoreResult<()> {
        self.soft_deactivate("blacklist_ips", id).await
    }

    /// Same as [`Self::add_ip`] but runs against a caller-supplied
    /// transaction, so an external-source re-ingestion can share one
    /// transaction with [`Self::deactivate_by_source_tag`].
    pub async fn add_ip_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Option<i64>,
        ip_address: &str,
        source: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<BlacklistIpRow> {
        sqlx::query_as::<_, BlacklistIpRow>(
            r#"
            INSERT INTO blacklist_ips (user_id, ip_address, is_active, source, expires_at)
            VALUES ($1, $2, true, $3, $4)
            ON CONFLICT (user_id, ip_address) DO UPDATE SET
                is_active = true, source = excluded.source, expires_at = excluded.expires_at,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(ip_address)
        .bind(source)
        .bind(expires_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(StoreError::from)
    }

    // ---- CIDR ---------------------------------------------------------

    pub async fn list_effective_ip_ranges(&self) -> StoreResult<Vec<BlacklistIpRangeRow>> {
        Ok(sqlx::query_as::<_, BlacklistIpRangeRow>(
            "SELECT * FROM blacklist_ip_ranges WHERE is_active = true \
             AND (expires_at IS NULL OR expires_at > now())",
        )
        .fetch_all(self.pool)
        .await?)
    }

    pub async fn add_ip_range(
        &self,
        user_id: Option<i64>,
        cidr: &str,
        source: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<BlacklistIpRangeRow> {
        sqlx::query_as::<_, BlacklistIpRangeRow>(
            r#"
            INSERT INTO blacklist_ip_ranges (user_id, cidr, is_active, source, expires_at)
            VALUES ($1, $2, true, $3, $4)
            ON CONFLICT (user_id, cidr) DO UPDATE SET
                is_active = true, source = excluded.source, expires_at = excluded.expires_at,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(cidr)
        .bind(source)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(StoreError::from)
    }

    pub async fn deactivate_ip_range(&self, id: i64) -> StoreResult<()> {
        self.soft_deactivate("blacklist_ip_ranges", id).await
    }

    /// Transaction-scoped counterpart of [`Self::add_ip_range`], for the
    /// same reason as [`Self::add_ip_tx`].
    pub async fn add_ip_range_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Option<i64>,
        cidr: &str,
        source: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<BlacklistIpRangeRow> {
        sqlx::query_as::<_, BlacklistIpRangeRow>(
            r#"
            INSERT INTO blacklist_ip_ranges (user_id, cidr, is_active, source, expires_at)
            VALUES ($1, $2, true, $3, $4)
            ON CONFLICT (user_id, cidr) DO UPDATE SET
                is_active = true, source = excluded.source, expires_at = excluded.expires_at,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(cidr)
        .bind(source)
        .bind(expires_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(StoreError::from)
    }

    // ---- UA -------------------------------------------------------------

    pub async fn list_effective_uas(&self) -> StoreResult<Vec<BlacklistUaRow>> {
        Ok(sqlx::query_as::<_, BlacklistUaRow>(
            "SELECT * FROM blacklist_uas WHERE is_active = true \
             AND (expires_at IS NULL OR expires_at > now())",
        )
        .fetch_all(self.pool)
        .await?)
    }

    pub async fn add_ua(
        &self,
        user_id: Option<i64>,
        pattern: &str,
        pattern_type: UaPatternType,
        source: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<BlacklistUaRow> {
        sqlx::query_as::<_, BlacklistUaRow>(
            r#"
            INSERT INTO blacklist_uas (user_id, pattern, pattern_type, is_active, source, expires_at)
            VALUES ($1, $2, $3, true, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(pattern)
        .bind(pattern_type)
        .bind(source)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(StoreError::from)
    }

    pub async fn deactivate_ua(&self, id: i64) -> StoreResult<()> {
        self.soft_deactivate("blacklist_uas", id).await
    }

    // ---- ISP / ASN ------------------------------------------------------

    pub async fn list_effective_isps(&self) -> StoreResult<Vec<BlacklistIspRow>> {
        Ok(sqlx::query_as::<_, BlacklistIspRow>(
            "SELECT * FROM blacklist_isps WHERE is_active = true \
             AND (expires_at IS NULL OR expires_at > now())",
        )
        .fetch_all(self.pool)
        .await?)
    }

    pub async fn add_isp(
        &self,
        user_id: Option<i64>,
        asn: Option<i64>,
        isp_name: Option<&str>,
        source: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<BlacklistIspRow> {
        if asn.is_none() && isp_name.is_none() {
            return Err(StoreError::Validation(
                "ISP rule requires at least one of asn/ispName".into(),
            ));
        }
        sqlx::query_as::<_, BlacklistIspRow>(
            r#"
            INSERT INTO blacklist_isps (user_id, asn, isp_name, is_active, source, expires_at)
            VALUES ($1, $2, $3, true, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(asn)
        .bind(isp_name)
        .bind(source)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(StoreError::from)
    }

    pub async fn deactivate_isp(&self, id: i64) -> StoreResult<()> {
        self.soft_deactivate("blacklist_isps", id).await
    }

    // ---- Geo --------------------------------------------------------------

    pub async fn list_effective_geos(&self) -> StoreResult<Vec<BlacklistGeoRow>> {
        Ok(sqlx::query_as::<_, BlacklistGeoRow>(
            "SELECT * FROM blacklist_geos WHERE is_active = true \
             AND (expires_at IS NULL OR expires_at > now())",
        )
        .fetch_all(self.pool)
        .await?)
    }

    pub async fn add_geo(
        &self,
        user_id: Option<i64>,
        country_code: &str,
        region_code: Option<&str>,
        block_type: GeoBlockType,
        source: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<BlacklistGeoRow> {
        sqlx::query_as::<_, BlacklistGeoRow>(
            r#"
            INSERT INTO blacklist_geos
                (user_id, country_code, region_code, block_type, is_active, source, expires_at)
            VALUES ($1, upper($2), $3, $4, true, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(country_code)
        .bind(region_code)
        .bind(block_type)
        .bind(source)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(StoreError::from)
    }

    pub async fn deactivate_geo(&self, id: i64) -> StoreResult<()> {
        self.soft_deactivate("blacklist_geos", id).await
    }

    // ---- Cleanup / external source support --------------------------------

    /// Deactivates every row across all five families whose `expires_at`
    /// has passed, returning the table names that had at least one row
    /// affected — the materializer only needs to rebuild those families.
    pub async fn deactivate_expired(&self) -> StoreResult<Vec<&'static str>> {
        let mut touched = Vec::new();
        for table in [
            "blacklist_ips",
            "blacklist_ip_ranges",
            "blacklist_uas",
            "blacklist_isps",
            "blacklist_geos",
        ] {
            let result = sqlx::query(&format!(
                "UPDATE {table} SET is_active = false, updated_at = now() \
                 WHERE is_active = true AND expires_at IS NOT NULL AND expires_at <= now()"
            ))
            .execute(self.pool)
            .await?;
            if result.rows_affected() > 0 {
                touched.push(table);
            }
        }
        Ok(touched)
    }

    /// Deactivates every rule tagged with `source = "source:<id>"` ahead
    /// of a full re-ingestion, in a single transaction — the source
    /// sync job replaces rather than appends.
    pub async fn deactivate_by_source_tag(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, source_tag: &str) -> StoreResult<()> {
        for table in [
            "blacklist_ips",
            "blacklist_ip_ranges",
            "blacklist_uas",
            "blacklist_isps",
            "blacklist_geos",
        ] {
            sqlx::query(&format!(
                "UPDATE {table} SET is_active = false, updated_at = now() WHERE source = $1"
            ))
            .bind(source_tag)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Every `user_id` (including `NULL` for global) that owns at least
    /// one row in `table`, active or not. The materializer unions this
    /// with the scopes that currently have an *effective* rule so a
    /// scope whose last rule just expired still gets its key rewritten
    /// to empty instead of left stale.
    pub async fn list_known_scopes(&self, table: &'static str) -> StoreResult<Vec<Option<i64>>> {
        let rows: Vec<(Option<i64>,)> =
            sqlx::query_as(&format!("SELECT DISTINCT user_id FROM {table}"))
                .fetch_all(self.pool)
                .await?;
        Ok(rows.into_iter().map(|(u,)| u).collect())
    }

    async fn soft_deactivate(&self, table: &str, id: i64) -> StoreResult<()> {
        let result = sqlx::query(&format!(
            "UPDATE {table} SET is_active = false, updated_at = now() WHERE id = $1"
        ))
        .bind(id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{table} rule {id}")));
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        self.pool
    }
}
