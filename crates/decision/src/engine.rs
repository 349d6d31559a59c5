use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use autoguard_fast::{keys, FastStore};
use autoguard_store::models::{BlockedLayer, CloakLogEntry, Decision, Scope};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cidr::CidrSet;
use crate::ip_intel::{IpIntelResult, IpIntelligence};
use crate::settings::DecisionSettings;
use crate::tracking;
use crate::types::{DecisionRecord, DecisionRequest, OfferContext, TrackingParams};
use crate::ua;

pub struct DecisionEngine {
    fast: Arc<FastStore>,
    settings: Arc<ArcSwap<DecisionSettings>>,
    ip_intel: Arc<dyn IpIntelligence>,
}

impl DecisionEngine {
    pub fn new(
        fast: Arc<FastStore>,
        settings: Arc<ArcSwap<DecisionSettings>>,
        ip_intel: Arc<dyn IpIntelligence>,
    ) -> Self {
        Self {
            fast,
            settings,
            ip_intel,
        }
    }

    pub async fn decide(&self, request: &DecisionRequest, offer: &OfferContext) -> DecisionRecord {
        let start = Instant::now();
        let settings = self.settings.load_full();
        let tracking_params = tracking::parse(&request.url);

        if !offer.cloak_enabled {
            let record = DecisionRecord {
                decision: Decision::Money,
                fraud_score: 0,
                blocked_at_layer: None,
                reason: None,
                details: json!({ "cloakDisabled": true }),
                tracking_params,
                processing_time_ms: elapsed_ms(start),
            };
            return self.finish(offer, request, &None, record).await;
        }

        let global = Scope::Global.as_key_fragment();
        let user_scope = Scope::User(offer.user_id).as_key_fragment();

        let mut score: i32 = 0;
        let mut details = serde_json::Map::new();

        macro_rules! deadline_check {
            ($layer:expr) => {
                if elapsed_ms(start) >= settings.total_deadline_ms {
                    let record = self.timeout_result(start, score, tracking_params, details, $layer);
                    return self.finish(offer, request, &intel, record).await;
                }
            };
        }

        // Resolve IP intelligence once, shared by L1's ISP/Geo checks
        // and L2's scoring — the spec names one intel collaborator and
        // doesn't document a second, faster ASN/geo source for L1. The
        // sub-deadline is derived from the remaining global budget (per
        // spec.md §4.D/§5's "sub-deadline derived from remaining
        // budget"), not a fixed per-layer allowance — otherwise an
        // intel call that sleeps past the global deadline gets cut off
        // early and the traversal continues as if nothing happened,
        // instead of the next `deadline_check!` firing TIMEOUT.
        let remaining_ms = (settings.total_deadline_ms - elapsed_ms(start)).max(0);
        let layer_budget = Duration::from_millis(remaining_ms as u64);
        let intel: Option<IpIntelResult> = match tokio::time::timeout(
            layer_budget,
            self.ip_intel.lookup(&request.ip, layer_budget),
        )
        .await
        {
            Ok(Ok(result)) => Some(result),
            Ok(Err(e)) => {
                details.insert("l2".into(), json!({ "error": e }));
                None
            }
            Err(_) => {
                details.insert("l2".into(), json!({ "error": "timeout" }));
                None
            }
        };

        // ---- L1: blacklist ----------------------------------------------
        // Each sub-check is gated by its own flag rather than one
        // monolithic L1 switch, per spec.md §4.D's "each layer's
        // enablement is individually gated"; ISP rides enable_ip_check
        // since the spec names no dedicated flag for it.
        deadline_check!(BlockedLayer::L1);
        if settings.enable_ip_check || settings.enable_ua_check || settings.enable_geo_check {
            if let Some(block) = self
                .l1_blacklist(&request.ip, &request.user_agent, &global, &user_scope, &intel, &settings)
                .await
            {
                let record = self.blocked_result(
                    start,
                    BlockedLayer::L1,
                    &block.reason,
                    block.details,
                    tracking_params,
                );
                return self.finish(offer, request, &intel, record).await;
            }
        }
        if let Some(intel) = &intel {
            if settings.enable_geo_check {
                if let Some(add) = self
                    .l1_geo_soft_signal(intel, &global, &user_scope, settings.geo_high_risk_weight)
                    .await
                {
                    score = (score + add).min(100);
                    details.insert("l1_geo_high_risk".into(), json!(true));
                    if score >= settings.safe_mode_threshold {
                        let record = self.blocked_result(
                            start,
                            BlockedLayer::L1,
                            "geo_high_risk",
                            json!(details),
                            tracking_params,
                        );
                        return self.finish(offer, request, &Some(intel.clone()), record).await;
                    }
                }
            }
        }

        // ---- L2: IP intelligence -----------------------------------------
        deadline_check!(BlockedLayer::L2);
        if let Some(intel) = &intel {
            let mut add = 0;
            if intel.is_datacenter {
                add += settings.datacenter_weight;
            }
            if intel.is_vpn || intel.is_proxy || intel.is_tor {
                add += settings.vpn_weight;
            }
            if add > 0 {
                score = (score + add).min(100);
                details.insert(
                    "l2".into(),
                    json!({
                        "isDatacenter": intel.is_datacenter,
                        "isVpn": intel.is_vpn,
                        "isProxy": intel.is_proxy,
                        "isTor": intel.is_tor,
                    }),
                );
                if score >= settings.safe_mode_threshold {
                    let record = self.blocked_result(
                        start,
                        BlockedLayer::L2,
                        "ip_intel_score",
                        json!(details),
                        tracking_params,
                    );
                    return self.finish(offer, request, &Some(intel.clone()), record).await;
                }
            }
        }

        // ---- L3: geo targeting ---------------------------------------------
        deadline_check!(BlockedLayer::L3);
        if !offer.target_countries.is_empty() {
            match intel.as_ref().and_then(|i| i.country.as_deref()) {
                Some(country) if offer.target_countries.iter().any(|c| c == country) => {}
                Some(_country) => {
                    let record = self.blocked_result(
                        start,
                        BlockedLayer::L3,
                        "geo_not_targeted",
                        json!(details),
                        tracking_params,
                    );
                    return self.finish(offer, request, &intel, record).await;
                }
                None => {
                    // Unknown country with a non-empty target list: fail
                    // safe rather than assume the visitor is in-region.
                    let record = self.blocked_result(
                        start,
                        BlockedLayer::L3,
                        "geo_unknown",
                        json!(details),
                        tracking_params,
                    );
                    return self.finish(offer, request, &intel, record).await;
                }
            }
        }

        // ---- L4: UA heuristics ----------------------------------------------
        deadline_check!(BlockedLayer::L4);
        if settings.enable_ua_check && ua::looks_automated(&request.user_agent) {
            score = (score + settings.ua_weight).min(100);
            details.insert("l4_automated_ua".into(), json!(true));
            if score >= settings.safe_mode_threshold {
                let record = self.blocked_result(
                    start,
                    BlockedLayer::L4,
                    "automated_ua",
                    json!(details),
                    tracking_params,
                );
                return self.finish(offer, request, &intel, record).await;
            }
        }

        // ---- L5: referer policy ----------------------------------------------
        deadline_check!(BlockedLayer::L5);
        if settings.enable_referer_check && !tracking_params.has_tracking_params() {
            if let Some(referer) = &request.referer {
                if settings
                    .moderation_tool_hosts
                    .iter()
                    .any(|host| referer_host_matches(referer, host))
                {
                    score = (score + settings.referer_weight).min(100);
                    details.insert("l5_moderation_tool_referer".into(), json!(referer));
                    if score >= settings.safe_mode_threshold {
                        let record = self.blocked_result(
                            start,
                            BlockedLayer::L5,
                            "moderation_tool_referer",
                            json!(details),
                            tracking_params,
                        );
                        return self.finish(offer, request, &intel, record).await;
                    }
                }
            }
            // Empty referer with no tracking params: organic type-in
            // traffic, allowed by explicit default policy.
        }

        let record = DecisionRecord {
            decision: Decision::Money,
            fraud_score: score,
            blocked_at_layer: None,
            reason: None,
            details: json!(details),
            tracking_params,
            processing_time_ms: elapsed_ms(start),
        };
        self.finish(offer, request, &intel, record).await
    }

    /// Common tail for every return path: emits the structured audit
    /// line and appends the cloak-log side-channel record, per
    /// spec.md §4.D's "append one JSON record to `queue:cloakLogs`"
    /// side effect — run for every decision, not just the money path,
    /// since blocked/timeout outcomes feed `blockedL1..L5`/`blockedTimeout`
    /// in `DailyStat` just as much as money visits feed `moneyPageVisits`.
    async fn finish(
        &self,
        offer: &OfferContext,
        request: &DecisionRequest,
        intel: &Option<IpIntelResult>,
        record: DecisionRecord,
    ) -> DecisionRecord {
        self.emit_audit(offer, &record);
        self.push_cloak_log(offer, request, intel, &record).await;
        record
    }

    /// Best-effort `lpush` onto `queue:cloakLogs` — the log flusher
    /// batch-drains it into the authoritative store. A failure here is
    /// logged and swallowed, never propagated to the caller: the cloak
    /// log is an accepted at-least-once loss window, not a correctness
    /// requirement of the hot path.
    async fn push_cloak_log(
        &self,
        offer: &OfferContext,
        request: &DecisionRequest,
        intel: &Option<IpIntelResult>,
        record: &DecisionRecord,
    ) {
        let entry = CloakLogEntry {
            id: Uuid::new_v4(),
            user_id: offer.user_id,
            offer_id: offer.offer_id,
            ip_address: request.ip.clone(),
            user_agent: request.user_agent.clone(),
            referer: request.referer.clone(),
            request_url: request.url.clone(),
            decision: record.decision,
            decision_reason: record.reason.clone(),
            fraud_score: record.fraud_score as i16,
            blocked_at_layer: record.blocked_at_layer,
            detection_details: record.details.clone(),
            ip_country: intel.as_ref().and_then(|i| i.country.clone()),
            ip_city: intel.as_ref().and_then(|i| i.city.clone()),
            ip_isp: intel.as_ref().and_then(|i| i.isp.clone()),
            ip_asn: intel.as_ref().and_then(|i| i.asn),
            is_datacenter: intel.as_ref().is_some_and(|i| i.is_datacenter),
            is_vpn: intel.as_ref().is_some_and(|i| i.is_vpn),
            is_proxy: intel.as_ref().is_some_and(|i| i.is_proxy),
            processing_time_ms: record.processing_time_ms as i32,
            has_tracking_params: record.tracking_params.has_tracking_params(),
            gclid: record.tracking_params.gclid.clone(),
            created_at: Utc::now(),
        };
        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(error) = self.fast.lpush(keys::QUEUE_CLOAK_LOGS, &json).await {
                    warn!(%error, "failed to enqueue cloak-log entry, dropping");
                }
            }
            Err(error) => warn!(%error, "failed to serialize cloak-log entry"),
        }
    }

    async fn l1_blacklist(
        &self,
        ip: &str,
        user_agent: &str,
        global: &str,
        user_scope: &str,
        intel: &Option<IpIntelResult>,
        settings: &DecisionSettings,
    ) -> Option<L1Block> {
        if settings.enable_ip_check {
            if let Ok(is_global) = self.fast.sismember(&keys::blacklist_ip(global), ip).await {
                if is_global {
                    return Some(L1Block {
                        reason: "ip_blocked".into(),
                        details: json!({ "l1": { "ipBlocked": true, "blockedValue": ip } }),
                    });
                }
            }
            if let Ok(is_user) = self.fast.sismember(&keys::blacklist_ip(user_scope), ip).await {
                if is_user {
                    return Some(L1Block {
                        reason: "ip_blocked".into(),
                        details: json!({ "l1": { "ipBlocked": true, "blockedValue": ip } }),
                    });
                }
            }

            if let Ok(addr) = ip.parse::<Ipv4Addr>() {
                for scope in [global, user_scope] {
                    if let Ok(Some(raw)) = self.fast.get(&keys::blacklist_ip_ranges(scope)).await {
                        let set = CidrSet::from_json_list(&raw);
                        if set.contains(addr) {
                            return Some(L1Block {
                                reason: "ip_blocked".into(),
                                details: json!({ "l1": { "ipBlocked": true, "blockedValue": ip } }),
                            });
                        }
                    }
                }
            }
        }

        if settings.enable_ua_check {
            for scope in [global, user_scope] {
                if let Ok(raw_entries) = self.fast.lrange_all(&keys::blacklist_uas(scope)).await {
                    let entries = ua::parse_entries(&raw_entries);
                    if entries.iter().any(|e| ua::matches(e, user_agent)) {
                        return Some(L1Block {
                            reason: "ua_blocked".into(),
                            details: json!({ "l1": { "uaBlocked": true, "blockedValue": user_agent } }),
                        });
                    }
                }
            }
        }

        if let Some(intel) = intel {
            if settings.enable_ip_check {
                if let Some(asn) = intel.asn {
                    for scope in [global, user_scope] {
                        if let Ok(true) = self
                            .fast
                            .sismember(&keys::blacklist_isps(scope), &asn.to_string())
                            .await
                        {
                            return Some(L1Block {
                                reason: "isp_blocked".into(),
                                details: json!({ "l1": { "ispBlocked": true, "blockedValue": asn } }),
                            });
                        }
                    }
                }
            }
            if settings.enable_geo_check {
                if let Some(country) = &intel.country {
                    let fields = geo_fields(country, intel.city.as_deref());
                    for scope in [global, user_scope] {
                        let hash = self
                            .fast
                            .hgetall(&keys::blacklist_geos(scope))
                            .await
                            .unwrap_or_default();
                        for field in &fields {
                            if hash.get(field).map(String::as_str) == Some("block") {
                                return Some(L1Block {
                                    reason: "geo_blocked".into(),
                                    details: json!({ "l1": { "geoBlocked": true, "blockedValue": field } }),
                                });
                            }
                        }
                    }
                }
            }
        }

        None
    }

    /// L1's `high_risk` geo signal is a soft additive score, not a
    /// short-circuit — returns the suggested addition when present.
    async fn l1_geo_soft_signal(
        &self,
        intel: &IpIntelResult,
        global: &str,
        user_scope: &str,
        weight: i32,
    ) -> Option<i32> {
        let country = intel.country.as_ref()?;
        let fields = geo_fields(country, intel.city.as_deref());
        for scope in [global, user_scope] {
            let hash = self
                .fast
                .hgetall(&keys::blacklist_geos(scope))
                .await
                .unwrap_or_default();
            for field in &fields {
                if hash.get(field).map(String::as_str) == Some("high_risk") {
                    return Some(weight);
                }
            }
        }
        None
    }

    fn blocked_result(
        &self,
        start: Instant,
        layer: BlockedLayer,
        reason: &str,
        details: serde_json::Value,
        tracking_params: TrackingParams,
    ) -> DecisionRecord {
        DecisionRecord {
            decision: Decision::Safe,
            fraud_score: 100,
            blocked_at_layer: Some(layer),
            reason: Some(reason.to_string()),
            details,
            tracking_params,
            processing_time_ms: elapsed_ms(start),
        }
    }

    fn timeout_result(
        &self,
        start: Instant,
        score: i32,
        tracking_params: TrackingParams,
        details: serde_json::Map<String, serde_json::Value>,
        _at_layer: BlockedLayer,
    ) -> DecisionRecord {
        DecisionRecord {
            decision: Decision::Safe,
            fraud_score: score,
            blocked_at_layer: Some(BlockedLayer::Timeout),
            reason: Some("deadline_exceeded".into()),
            details: json!(details),
            tracking_params,
            processing_time_ms: elapsed_ms(start),
        }
    }

    fn emit_audit(&self, offer: &OfferContext, record: &DecisionRecord) {
        info!(
            offer_id = offer.offer_id,
            decision = ?record.decision,
            fraud_score = record.fraud_score,
            blocked_at_layer = ?record.blocked_at_layer,
            processing_time_ms = record.processing_time_ms,
            "cloak decision"
        );
    }
}

struct L1Block {
    reason: String,
    details: serde_json::Value,
}

fn geo_fields(country: &str, region: Option<&str>) -> Vec<String> {
    let mut fields = vec![country.to_string()];
    if let Some(region) = region {
        fields.push(format!("{country}:{region}"));
    }
    fields
}

fn referer_host_matches(referer: &str, host: &str) -> bool {
    referer.to_ascii_lowercase().contains(&host.to_ascii_lowercase())
}

fn elapsed_ms(start: Instant) -> i64 {
    start.elapsed().as_millis() as i64
}
