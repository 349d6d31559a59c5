//! Resolves an inbound request's `host` to the offer it belongs to.
//! Per the documented lookup order the decision engine's composition
//! root follows `offer:byDomain:<host>` then `offer:bySubdomain:<label>`
//! against the fast lookup store, falling back to the authoritative
//! store and repopulating the cache on a miss — the usual cache-aside
//! shape, cheap because the routing payload is tiny and stable.

use autoguard_fast::{keys, FastStore};
use autoguard_store::models::OfferStatus;
use autoguard_store::Database;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::OfferContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferRouting {
    #[serde(rename = "offerId")]
    pub offer_id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub subdomain: String,
    #[serde(rename = "cloakEnabled")]
    pub cloak_enabled: bool,
    #[serde(rename = "targetCountries")]
    pub target_countries: Vec<String>,
    pub status: OfferStatus,
}

impl OfferRouting {
    pub fn as_offer_context(&self) -> OfferContext {
        OfferContext {
            offer_id: self.offer_id,
            user_id: self.user_id,
            cloak_enabled: self.cloak_enabled && self.status == OfferStatus::Active,
            target_countries: self.target_countries.clone(),
        }
    }
}

/// `host` is the `Host` header as seen by the edge — tried first as a
/// custom domain, then (taking the first label) as `<subdomain>.<root>`.
pub async fn resolve_offer(
    fast: &FastStore,
    store: &Database,
    host: &str,
) -> Option<OfferRouting> {
    let host = host.trim().to_ascii_lowercase();
    if let Some(routing) = lookup_cached(fast, &keys::offer_by_domain(&host)).await {
        return Some(routing);
    }

    let first_label = host.split('.').next().unwrap_or(&host);
    if let Some(routing) = lookup_cached(fast, &keys::offer_by_subdomain(first_label)).await {
        return Some(routing);
    }

    // Cache miss on both keys: fall back to the authoritative store and
    // repopulate whichever key will serve the next request for this host.
    if let Ok(Some(offer)) = store.offers().find_by_custom_domain(&host).await {
        let routing = OfferRouting::from(&offer);
        cache(fast, &keys::offer_by_domain(&host), &routing).await;
        return Some(routing);
    }
    if let Ok(Some(offer)) = store.offers().find_by_subdomain(first_label).await {
        let routing = OfferRouting::from(&offer);
        cache(fast, &keys::offer_by_subdomain(first_label), &routing).await;
        return Some(routing);
    }
    None
}

async fn lookup_cached(fast: &FastStore, key: &str) -> Option<OfferRouting> {
    match fast.get_json::<OfferRouting>(key).await {
        Ok(routing) => routing,
        Err(error) => {
            warn!(%error, key, "offer routing cache read failed");
            None
        }
    }
}

async fn cache(fast: &FastStore, key: &str, routing: &OfferRouting) {
    if let Err(error) = fast.set_json(key, routing).await {
        warn!(%error, key, "failed to repopulate offer routing cache");
    }
}

impl From<&autoguard_store::models::OfferRow> for OfferRouting {
    fn from(row: &autoguard_store::models::OfferRow) -> Self {
        Self {
            offer_id: row.id,
            user_id: row.user_id,
            subdomain: row.subdomain.clone(),
            cloak_enabled: row.cloak_enabled,
            target_countries: row.target_countries.clone(),
            status: row.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_offer_never_reports_cloak_enabled() {
        let routing = OfferRouting {
            offer_id: 1,
            user_id: 1,
            subdomain: "acme".into(),
            cloak_enabled: true,
            target_countries: vec![],
            status: OfferStatus::Draft,
        };
        assert!(!routing.as_offer_context().cloak_enabled);
    }
}
