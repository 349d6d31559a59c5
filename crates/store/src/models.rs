//! Row and domain types for every entity in the data model.
//!
//! Enums are stored as `TEXT` columns and round-trip through sqlx's
//! `Type` derive with `type_name = "text"` — the same "row struct now,
//! typed enum always" split the rest of the ecosystem uses for Postgres
//! columns that don't warrant a native `CREATE TYPE`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Suspended,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum CustomDomainStatus {
    None,
    Pending,
    Verified,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ScrapeStatus {
    Pending,
    Scraping,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum OfferStatus {
    Draft,
    Active,
    Paused,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OfferRow {
    pub id: i64,
    pub user_id: i64,
    pub brand_name: String,
    pub brand_url: String,
    pub affiliate_link: String,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub custom_domain_status: CustomDomainStatus,
    pub custom_domain_token: Option<String>,
    pub custom_domain_verified_at: Option<DateTime<Utc>>,
    pub custom_domain_verification_error: Option<String>,
    pub cloak_enabled: bool,
    /// ISO-3166-1 alpha-2 codes. Stored as a Postgres `text[]`.
    pub target_countries: Vec<String>,
    pub scrape_status: ScrapeStatus,
    pub scrape_error: Option<String>,
    pub page_title: Option<String>,
    pub page_description: Option<String>,
    pub status: OfferStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum PageType {
    Money,
    Safe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ContentSource {
    Scraped,
    Generated,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum SafePageType {
    Review,
    Tips,
    Comparison,
    Guide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum PageStatus {
    Draft,
    Generating,
    Generated,
    Published,
    Failed,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PageRow {
    pub id: i64,
    pub offer_id: i64,
    pub page_type: PageType,
    pub content_source: ContentSource,
    pub safe_page_type: Option<SafePageType>,
    pub competitors: Option<Vec<String>>,
    pub generation_params: serde_json::Value,
    pub html_content: Option<String>,
    pub status: PageStatus,
    pub generation_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Scope of a blacklist rule, materialized as a Redis key suffix. `None`
/// user id means global scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Global,
    User(i64),
}

impl Scope {
    pub fn as_key_fragment(&self) -> String {
        match self {
            Scope::Global => "global".to_string(),
            Scope::User(id) => format!("user:{id}"),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_key_fragment())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Copy, Hash, Serialize, Deserialize)]
pub enum RuleFamily {
    Ip,
    IpRange,
    Ua,
    Isp,
    Geo,
}

impl RuleFamily {
    pub const ALL: [RuleFamily; 5] = [
        RuleFamily::Ip,
        RuleFamily::IpRange,
        RuleFamily::Ua,
        RuleFamily::Isp,
        RuleFamily::Geo,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            RuleFamily::Ip => "blacklist_ips",
            RuleFamily::IpRange => "blacklist_ip_ranges",
            RuleFamily::Ua => "blacklist_uas",
            RuleFamily::Isp => "blacklist_isps",
            RuleFamily::Geo => "blacklist_geos",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BlacklistIpRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub ip_address: String,
    pub is_active: bool,
    pub source: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BlacklistIpRangeRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub cidr: String,
    pub is_active: bool,
    pub source: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum UaPatternType {
    Exact,
    Contains,
    Regex,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BlacklistUaRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub pattern: String,
    pub pattern_type: UaPatternType,
    pub is_active: bool,
    pub source: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BlacklistIspRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub asn: Option<i64>,
    pub isp_name: Option<String>,
    pub is_active: bool,
    pub source: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum GeoBlockType {
    Block,
    HighRisk,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BlacklistGeoRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub country_code: String,
    pub region_code: Option<String>,
    pub block_type: GeoBlockType,
    pub is_active: bool,
    pub source: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum SourceType {
    Builtin,
    External,
    Community,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum UpdateFrequency {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Failed,
    Syncing,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BlacklistSourceRow {
    pub id: i64,
    pub name: String,
    pub source_type: SourceType,
    pub url: Option<String>,
    pub update_frequency: UpdateFrequency,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub next_sync_at: Option<DateTime<Utc>>,
    pub sync_status: Option<SyncStatus>,
    pub sync_error: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum Decision {
    Money,
    Safe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum BlockedLayer {
    L1,
    L2,
    L3,
    L4,
    L5,
    Timeout,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct CloakLogEntry {
    pub id: Uuid,
    pub user_id: i64,
    pub offer_id: i64,
    pub ip_address: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub request_url: String,
    pub decision: Decision,
    pub decision_reason: Option<String>,
    pub fraud_score: i16,
    pub blocked_at_layer: Option<BlockedLayer>,
    pub detection_details: serde_json::Value,
    pub ip_country: Option<String>,
    pub ip_city: Option<String>,
    pub ip_isp: Option<String>,
    pub ip_asn: Option<i64>,
    pub is_datacenter: bool,
    pub is_vpn: bool,
    pub is_proxy: bool,
    pub processing_time_ms: i32,
    pub has_tracking_params: bool,
    pub gclid: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, sqlx::FromRow, Serialize)]
pub struct DailyStatRow {
    pub user_id: i64,
    pub offer_id: i64,
    pub stat_date: chrono::NaiveDate,
    pub total_visits: i64,
    pub money_page_visits: i64,
    pub safe_page_visits: i64,
    pub unique_ips: i64,
    pub avg_fraud_score: f64,
    pub blocked_l1: i64,
    pub blocked_l2: i64,
    pub blocked_l3: i64,
    pub blocked_l4: i64,
    pub blocked_l5: i64,
    pub blocked_timeout: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PromptRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PromptVersionRow {
    pub id: i64,
    pub prompt_id: i64,
    pub content: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A decision-engine tunable, hot-reloaded from the `settings` table.
/// Stored as `(key, value)` text pairs so new knobs never require a
/// migration — per the open design question in the original spec that
/// every layer weight must be an exposed setting.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettingRow {
    pub key: String,
    pub value: String,
}
