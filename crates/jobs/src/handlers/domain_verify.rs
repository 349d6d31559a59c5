//! Custom-domain verification handler: confirms the offer owner
//! actually controls the domain they entered before cloaking traffic
//! is ever routed to it. Two independent checks must both pass — a
//! DNS TXT record carrying the derived token, and an HTTP ping to a
//! well-known path — and either failing records which one in
//! `custom_domain_verification_error` so the owner can see why.

use std::sync::Arc;

use autoguard_fast::{keys, FastStore};
use autoguard_store::Database;
use tracing::info;

use crate::collaborators::{DnsResolver, HttpVerifier};
use crate::domain_token::{derive_token, txt_record_name, txt_record_value};
use crate::error::{JobError, JobResult};
use crate::job::DomainVerifyJob;

pub async fn handle(
    job: &DomainVerifyJob,
    store: &Database,
    fast: &FastStore,
    dns: &Arc<dyn DnsResolver>,
    verifier: &Arc<dyn HttpVerifier>,
) -> JobResult<()> {
    let offer = store.offers().find_by_id(job.offer_id).await?;
    let custom_domain = offer
        .custom_domain
        .as_deref()
        .ok_or_else(|| JobError::Validation(format!("offer {} has no custom domain", job.offer_id)))?;
    let token = offer
        .custom_domain_token
        .clone()
        .unwrap_or_else(|| derive_token(&offer.subdomain));

    let record_name = txt_record_name(custom_domain);
    let expected_value = txt_record_value(&token);

    let txt_records = dns
        .resolve_txt(&record_name)
        .await
        .map_err(|e| JobError::Transient(format!("dns lookup failed: {e}")))?;

    if !txt_records.iter().any(|v| v == &expected_value) {
        let details = format!("TXT record {record_name} does not contain {expected_value}");
        store.offers().mark_custom_domain_failed(job.offer_id, &details).await?;
        info!(offer_id = job.offer_id, custom_domain, "domain verification failed: dns");
        return Ok(());
    }

    let pinged = verifier
        .ping(custom_domain)
        .await
        .map_err(|e| JobError::Transient(format!("http ping failed: {e}")))?;

    if !pinged {
        let details = format!("HTTP ping to {custom_domain} did not return the expected body");
        store.offers().mark_custom_domain_failed(job.offer_id, &details).await?;
        info!(offer_id = job.offer_id, custom_domain, "domain verification failed: http ping");
        return Ok(());
    }

    store.offers().mark_custom_domain_verified(job.offer_id).await?;

    // Routing cache keyed by the old lookup paths may still be warm from
    // before the domain was attached; drop them so the next request re-reads
    // the now-verified offer from the authoritative store.
    fast.del(&keys::offer_by_subdomain(&offer.subdomain)).await?;
    fast.del(&keys::offer_by_domain(custom_domain)).await?;
    fast.del(&keys::offer_by_id(offer.id)).await?;

    info!(offer_id = job.offer_id, custom_domain, "domain verification succeeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_txt_value_matches_documented_prefix() {
        let token = derive_token("acme");
        assert_eq!(txt_record_value(&token), format!("ag-verify={token}"));
    }
}
