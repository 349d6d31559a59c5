use std::collections::HashMap;

use autoguard_store::models::{BlockedLayer, Decision};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct DecisionRequest {
    pub ip: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub url: String,
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct OfferContext {
    pub offer_id: i64,
    pub user_id: i64,
    pub cloak_enabled: bool,
    pub target_countries: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackingParams {
    pub gclid: Option<String>,
    pub fbclid: Option<String>,
    pub msclkid: Option<String>,
    pub ttclid: Option<String>,
    pub twclid: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub referrer_tag: Option<String>,
    pub affiliate_id: Option<String>,
    pub click_id: Option<String>,
}

impl TrackingParams {
    /// Presence of any click-id is an affirmative signal of a real ad
    /// click — used by L5 as a tiebreaker.
    pub fn has_tracking_params(&self) -> bool {
        self.gclid.is_some()
            || self.fbclid.is_some()
            || self.msclkid.is_some()
            || self.ttclid.is_some()
            || self.twclid.is_some()
            || self.click_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub decision: Decision,
    pub fraud_score: i32,
    pub blocked_at_layer: Option<BlockedLayer>,
    pub reason: Option<String>,
    pub details: serde_json::Value,
    pub tracking_params: TrackingParams,
    pub processing_time_ms: i64,
}
