//! Typed key builders for every Redis key the fast lookup store touches.
//!
//! The key schema is a contract (spec'd literally as a table of
//! patterns), so it lives here as functions rather than scattered
//! `format!` calls — the same "tagged variant, not a generic map"
//! instinct applied to key construction instead of payload shapes.

/// `scope` is either `"global"` or `"user:<id>"` — callers pass the
/// already-rendered fragment from `autoguard_store::models::Scope`.
pub fn blacklist_ip(scope: &str) -> String {
    format!("blacklist:ip:{scope}")
}

pub fn blacklist_ip_ranges(scope: &str) -> String {
    format!("blacklist:ipranges:{scope}")
}

pub fn blacklist_uas(scope: &str) -> String {
    format!("blacklist:uas:{scope}")
}

pub fn blacklist_isps(scope: &str) -> String {
    format!("blacklist:isps:{scope}")
}

pub fn blacklist_isp_names(scope: &str) -> String {
    format!("blacklist:isps:{scope}:names")
}

pub fn blacklist_geos(scope: &str) -> String {
    format!("blacklist:geos:{scope}")
}

pub fn offer_by_subdomain(subdomain: &str) -> String {
    format!("offer:bySubdomain:{subdomain}")
}

pub fn offer_by_domain(domain: &str) -> String {
    format!("offer:byDomain:{domain}")
}

pub fn offer_by_id(id: i64) -> String {
    format!("offer:byId:{id}")
}

pub const QUEUE_PAGE_GENERATION: &str = "queue:pageGeneration";
pub const QUEUE_PAGE_GENERATION_PROCESSING: &str = "queue:pageGeneration:processing";
pub const QUEUE_PAGE_GENERATION_DELAYED: &str = "queue:pageGeneration:delayed";
pub const QUEUE_PAGE_GENERATION_DEAD: &str = "queue:pageGeneration:dead";

pub const QUEUE_CLOAK_LOGS: &str = "queue:cloakLogs";

pub const QUEUE_BLACKLIST_SYNC: &str = "queue:blacklistSync";
pub const QUEUE_BLACKLIST_SYNC_PROCESSING: &str = "queue:blacklistSync:processing";
pub const QUEUE_BLACKLIST_SYNC_DELAYED: &str = "queue:blacklistSync:delayed";
pub const QUEUE_BLACKLIST_SYNC_DEAD: &str = "queue:blacklistSync:dead";

pub fn session(sid: &str) -> String {
    format!("session:{sid}")
}

pub fn session_user(uid: i64) -> String {
    format!("session:user:{uid}")
}

pub fn prompt(name: &str) -> String {
    format!("prompt:{name}")
}

/// Derives the `:processing`, `:delayed`, `:dead` companion keys for any
/// main queue key so the job-pipeline's generic reliable-queue code
/// doesn't need a family-specific match statement.
pub struct QueueKeys {
    pub main: String,
    pub processing: String,
    pub delayed: String,
    pub dead: String,
}

impl QueueKeys {
    pub fn for_queue(main: &str) -> Self {
        Self {
            main: main.to_string(),
            processing: format!("{main}:processing"),
            delayed: format!("{main}:delayed"),
            dead: format!("{main}:dead"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_routing_keys_round_trip_the_lookup_value() {
        assert_eq!(offer_by_subdomain("acme"), "offer:bySubdomain:acme");
        assert_eq!(offer_by_domain("acme.example.com"), "offer:byDomain:acme.example.com");
        assert_eq!(offer_by_id(42), "offer:byId:42");
    }

    #[test]
    fn queue_keys_derive_companion_keys() {
        let qk = QueueKeys::for_queue(QUEUE_PAGE_GENERATION);
        assert_eq!(qk.processing, "queue:pageGeneration:processing");
        assert_eq!(qk.delayed, "queue:pageGeneration:delayed");
        assert_eq!(qk.dead, "queue:pageGeneration:dead");
    }
}
