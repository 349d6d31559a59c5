pub mod cidr;
pub mod engine;
pub mod error;
pub mod ip_intel;
pub mod routing;
pub mod settings;
pub mod tracking;
pub mod types;
pub mod ua;

pub use engine::DecisionEngine;
pub use error::DecisionError;
pub use ip_intel::{IpIntelResult, IpIntelligence, NullIpIntelligence};
pub use routing::OfferRouting;
pub use settings::{DecisionSettings, SettingsCache};
pub use types::{DecisionRecord, DecisionRequest, OfferContext, TrackingParams};

#[cfg(test)]
mod tests {
    use super::*;
    use autoguard_store::models::Decision;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn offer(cloak_enabled: bool) -> OfferContext {
        OfferContext {
            offer_id: 1,
            user_id: 1,
            cloak_enabled,
            target_countries: vec![],
        }
    }

    fn request(ip: &str, ua: &str, url: &str) -> DecisionRequest {
        DecisionRequest {
            ip: ip.to_string(),
            user_agent: ua.to_string(),
            referer: None,
            url: url.to_string(),
            headers: HashMap::new(),
        }
    }

    #[test]
    fn settings_default_matches_store_defaults() {
        let settings = DecisionSettings::default();
        assert_eq!(settings.safe_mode_threshold, 50);
        assert_eq!(settings.total_deadline_ms, 100);
    }

    // Requires a reachable Redis instance (`FastStore::connect` performs
    // a real connection handshake) — run explicitly with `--ignored`.
    #[tokio::test]
    #[ignore]
    async fn cloak_disabled_is_always_money_with_zero_score() {
        let fast = Arc::new(dummy_fast_store().await);
        let settings = Arc::new(arc_swap::ArcSwap::from_pointee(DecisionSettings::default()));
        let engine = DecisionEngine::new(fast, settings, Arc::new(NullIpIntelligence));

        let record = engine
            .decide(
                &request("203.0.113.9", "Mozilla/5.0", "https://example.com/"),
                &offer(false),
            )
            .await;

        assert!(matches!(record.decision, Decision::Money));
        assert_eq!(record.fraud_score, 0);
        assert!(record.blocked_at_layer.is_none());
    }

    #[tokio::test]
    #[ignore]
    async fn automated_user_agent_raises_score_and_can_cross_threshold() {
        let fast = Arc::new(dummy_fast_store().await);
        let mut base = DecisionSettings::default();
        base.ua_weight = 90;
        base.enable_ip_check = false;
        base.enable_geo_check = false;
        base.enable_referer_check = false;
        let settings = Arc::new(arc_swap::ArcSwap::from_pointee(base));
        let engine = DecisionEngine::new(fast, settings, Arc::new(NullIpIntelligence));

        let record = engine
            .decide(
                &request("203.0.113.9", "python-requests/2.31.0", "https://example.com/"),
                &offer(true),
            )
            .await;

        assert!(matches!(record.decision, Decision::Safe));
        assert_eq!(
            record.blocked_at_layer,
            Some(autoguard_store::models::BlockedLayer::L4)
        );
    }

    // A FastStore pointed at a connection that is never actually used by
    // these tests (L1 is disabled or short-circuits before a real round
    // trip would matter) — constructing one requires a reachable Redis,
    // so these tests only disable the layers that would need it.
    async fn dummy_fast_store() -> autoguard_fast::FastStore {
        autoguard_fast::FastStore::connect("redis://127.0.0.1:6379/0")
            .await
            .expect("local redis instance for ignored integration tests")
    }
}
