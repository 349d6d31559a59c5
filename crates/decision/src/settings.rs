use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use autoguard_store::settings::defaults;
use autoguard_store::Database;
use tracing::{error, info};

/// Per-process snapshot of every decision-engine tunable, refreshed on
/// a timer from the authoritative store. Held behind `ArcSwap` so the
/// hot path reads a consistent snapshot without ever blocking on a
/// lock — the same hot-swap discipline a DNS filter uses to swap a
/// compiled block index, applied here to a settings struct instead.
#[derive(Debug, Clone)]
pub struct DecisionSettings {
    pub safe_mode_threshold: i32,
    pub layer_deadline_ms: i64,
    pub total_deadline_ms: i64,
    pub ua_weight: i32,
    pub referer_weight: i32,
    pub datacenter_weight: i32,
    pub vpn_weight: i32,
    pub geo_high_risk_weight: i32,
    pub enable_ip_check: bool,
    pub enable_ua_check: bool,
    pub enable_geo_check: bool,
    pub enable_referer_check: bool,
    pub moderation_tool_hosts: Vec<String>,
}

impl Default for DecisionSettings {
    fn default() -> Self {
        Self {
            safe_mode_threshold: defaults::SAFE_MODE_THRESHOLD_DEFAULT,
            layer_deadline_ms: defaults::LAYER_DEADLINE_MS_DEFAULT as i64,
            total_deadline_ms: defaults::TOTAL_DEADLINE_MS_DEFAULT as i64,
            ua_weight: defaults::UA_WEIGHT_DEFAULT,
            referer_weight: defaults::REFERER_WEIGHT_DEFAULT,
            datacenter_weight: defaults::DATACENTER_WEIGHT_DEFAULT,
            vpn_weight: defaults::VPN_WEIGHT_DEFAULT,
            geo_high_risk_weight: defaults::GEO_HIGH_RISK_WEIGHT_DEFAULT,
            enable_ip_check: true,
            enable_ua_check: true,
            enable_geo_check: true,
            enable_referer_check: true,
            moderation_tool_hosts: vec!["ads.google.com".into(), "facebook.com".into()],
        }
    }
}

impl DecisionSettings {
    async fn load(store: &Database) -> Self {
        let mut settings = Self::default();
        let rows = match store.settings().all().await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "failed to load decision settings, keeping previous snapshot");
                return settings;
            }
        };
        for row in rows {
            match row.key.as_str() {
                k if k == defaults::SAFE_MODE_THRESHOLD => {
                    if let Ok(v) = row.value.parse() {
                        settings.safe_mode_threshold = v;
                    }
                }
                k if k == defaults::LAYER_DEADLINE_MS => {
                    if let Ok(v) = row.value.parse() {
                        settings.layer_deadline_ms = v;
                    }
                }
                k if k == defaults::TOTAL_DEADLINE_MS => {
                    if let Ok(v) = row.value.parse() {
                        settings.total_deadline_ms = v;
                    }
                }
                k if k == defaults::UA_WEIGHT => {
                    if let Ok(v) = row.value.parse() {
                        settings.ua_weight = v;
                    }
                }
                k if k == defaults::REFERER_WEIGHT => {
                    if let Ok(v) = row.value.parse() {
                        settings.referer_weight = v;
                    }
                }
                k if k == defaults::DATACENTER_WEIGHT => {
                    if let Ok(v) = row.value.parse() {
                        settings.datacenter_weight = v;
                    }
                }
                k if k == defaults::VPN_WEIGHT => {
                    if let Ok(v) = row.value.parse() {
                        settings.vpn_weight = v;
                    }
                }
                k if k == defaults::GEO_HIGH_RISK_WEIGHT => {
                    if let Ok(v) = row.value.parse() {
                        settings.geo_high_risk_weight = v;
                    }
                }
                "decision.enable_ip_check" => settings.enable_ip_check = row.value == "true",
                "decision.enable_ua_check" => settings.enable_ua_check = row.value == "true",
                "decision.enable_geo_check" => settings.enable_geo_check = row.value == "true",
                "decision.enable_referer_check" => {
                    settings.enable_referer_check = row.value == "true"
                }
                "decision.moderation_tool_hosts" => {
                    settings.moderation_tool_hosts =
                        row.value.split(',').map(|s| s.trim().to_string()).collect();
                }
                _ => {}
            }
        }
        settings
    }
}

/// Owns the `ArcSwap` cell and the background refresh task. Construct
/// once per process; clone the returned `Arc<ArcSwap<_>>` into the
/// decision engine.
pub struct SettingsCache {
    cell: Arc<ArcSwap<DecisionSettings>>,
}

impl SettingsCache {
    pub async fn bootstrap(store: Arc<Database>) -> Self {
        let initial = DecisionSettings::load(&store).await;
        Self {
            cell: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    pub fn cell(&self) -> Arc<ArcSwap<DecisionSettings>> {
        self.cell.clone()
    }

    pub fn current(&self) -> Arc<DecisionSettings> {
        self.cell.load_full()
    }

    /// Spawns the periodic refresh task. Writes to `settings` are
    /// intentionally not read back synchronously — per spec, a writer
    /// waits up to `interval` for its change to take effect.
    pub fn spawn_refresh(&self, store: Arc<Database>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cell = self.cell.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let fresh = DecisionSettings::load(&store).await;
                cell.store(Arc::new(fresh));
                info!("decision settings snapshot refreshed");
            }
        })
    }
}
