use sqlx::PgPool;

use crate::error::StoreResult;
use crate::models::SettingRow;

/// Decision-engine tunables stored as `(key, value)` text pairs. Every
/// getter falls back to a compiled-in default so an empty or partially
/// seeded `settings` table never blocks the decision engine from
/// booting — only an explicit row overrides the default.
pub struct Settings<'a> {
    pool: &'a PgPool,
}

impl<'a> Settings<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn all(&self) -> StoreResult<Vec<SettingRow>> {
        Ok(sqlx::query_as::<_, SettingRow>("SELECT key, value FROM settings")
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM settings WHERE key = $1")
                .bind(key)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(|(v,)| v))
    }

    pub async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

/// The compiled-in defaults every tunable falls back to when `settings`
/// has no row for it — named keys the decision engine reads via
/// [`Settings::get`].
pub mod defaults {
    /// Spec name is `decision_timeout_ms`; stored under the
    /// `decision.*` namespace with every other engine tunable.
    pub const SAFE_MODE_THRESHOLD: &str = "decision.safe_mode_threshold";
    pub const SAFE_MODE_THRESHOLD_DEFAULT: i32 = 50;

    pub const LAYER_DEADLINE_MS: &str = "decision.layer_deadline_ms";
    pub const LAYER_DEADLINE_MS_DEFAULT: i32 = 60;

    pub const TOTAL_DEADLINE_MS: &str = "decision.total_deadline_ms";
    pub const TOTAL_DEADLINE_MS_DEFAULT: i32 = 100;

    pub const CLOAK_LOG_RETENTION_DAYS: &str = "cloaklog.retention_days";
    pub const CLOAK_LOG_RETENTION_DAYS_DEFAULT: i32 = 90;

    pub const UA_WEIGHT: &str = "decision.ua_weight";
    pub const UA_WEIGHT_DEFAULT: i32 = 25;

    pub const REFERER_WEIGHT: &str = "decision.referer_weight";
    pub const REFERER_WEIGHT_DEFAULT: i32 = 15;

    pub const DATACENTER_WEIGHT: &str = "decision.datacenter_weight";
    pub const DATACENTER_WEIGHT_DEFAULT: i32 = 40;

    pub const VPN_WEIGHT: &str = "decision.vpn_weight";
    pub const VPN_WEIGHT_DEFAULT: i32 = 30;

    pub const GEO_HIGH_RISK_WEIGHT: &str = "decision.geo_high_risk_weight";
    pub const GEO_HIGH_RISK_WEIGHT_DEFAULT: i32 = 30;
}
