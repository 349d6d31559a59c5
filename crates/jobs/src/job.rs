//! Job payload shapes. Every job is a plain JSON object round-tripped
//! through the fast lookup store's lists — `serde` handles the shape,
//! `attempt` is mutated in place and the new JSON re-pushed on retry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Scrape,
    AiGenerate,
}

/// `{pageId, offerId, variant, action, sourceUrl, subdomain, safePageType?,
/// affiliateLink?, competitors?, attempt?}` per the external interface
/// spec. Money pages are scrape-only (`variant=a, action=scrape`); safe
/// pages are AI-only (`variant=b, action=ai_generate`) — the enqueuer
/// enforces the pairing, the worker rejects a mismatch as permanent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageGenerationJob {
    #[serde(rename = "pageId")]
    pub page_id: i64,
    #[serde(rename = "offerId")]
    pub offer_id: i64,
    pub variant: Variant,
    pub action: Action,
    #[serde(rename = "sourceUrl", skip_serializing_if = "Option::is_none", default)]
    pub source_url: Option<String>,
    pub subdomain: String,
    #[serde(rename = "safePageType", skip_serializing_if = "Option::is_none", default)]
    pub safe_page_type: Option<String>,
    #[serde(rename = "affiliateLink", skip_serializing_if = "Option::is_none", default)]
    pub affiliate_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub competitors: Option<Vec<String>>,
    #[serde(default)]
    pub attempt: u32,
}

impl PageGenerationJob {
    /// The money-scrape/safe-AI pairing is the one payload invariant the
    /// worker enforces as a `Validation` failure rather than a retry.
    pub fn validate(&self) -> Result<(), String> {
        match (self.variant, self.action) {
            (Variant::A, Action::Scrape) => {
                if self.source_url.is_none() {
                    return Err("variant=a scrape job missing sourceUrl".into());
                }
                Ok(())
            }
            (Variant::B, Action::AiGenerate) => {
                if self.safe_page_type.is_none() {
                    return Err("variant=b ai_generate job missing safePageType".into());
                }
                Ok(())
            }
            (Variant::A, Action::AiGenerate) | (Variant::B, Action::Scrape) => {
                Err(format!("invalid variant/action pairing: {:?}/{:?}", self.variant, self.action))
            }
        }
    }
}

/// `{sourceId, sourceName?, sourceType?, url?, triggeredBy?, triggeredAt?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSyncJob {
    #[serde(rename = "sourceId")]
    pub source_id: i64,
    #[serde(rename = "sourceName", skip_serializing_if = "Option::is_none", default)]
    pub source_name: Option<String>,
    #[serde(rename = "sourceType", skip_serializing_if = "Option::is_none", default)]
    pub source_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
    #[serde(rename = "triggeredBy", skip_serializing_if = "Option::is_none", default)]
    pub triggered_by: Option<String>,
    #[serde(rename = "triggeredAt", skip_serializing_if = "Option::is_none", default)]
    pub triggered_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub attempt: u32,
}

/// Domain-verification jobs carry nothing but the offer id — the
/// handler reads everything else (token, custom domain) fresh from the
/// authoritative store so a redelivered job always checks current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainVerifyJob {
    #[serde(rename = "offerId")]
    pub offer_id: i64,
    #[serde(default)]
    pub attempt: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_job_requires_source_url() {
        let job = PageGenerationJob {
            page_id: 1,
            offer_id: 1,
            variant: Variant::A,
            action: Action::Scrape,
            source_url: None,
            subdomain: "acme".into(),
            safe_page_type: None,
            affiliate_link: None,
            competitors: None,
            attempt: 0,
        };
        assert!(job.validate().is_err());
    }

    #[test]
    fn money_page_ai_generate_is_an_invalid_pairing() {
        let job = PageGenerationJob {
            page_id: 1,
            offer_id: 1,
            variant: Variant::A,
            action: Action::AiGenerate,
            source_url: Some("https://example.com".into()),
            subdomain: "acme".into(),
            safe_page_type: None,
            affiliate_link: None,
            competitors: None,
            attempt: 0,
        };
        assert!(job.validate().is_err());
    }

    #[test]
    fn valid_safe_page_job_round_trips_through_json() {
        let job = PageGenerationJob {
            page_id: 2,
            offer_id: 1,
            variant: Variant::B,
            action: Action::AiGenerate,
            source_url: None,
            subdomain: "acme".into(),
            safe_page_type: Some("review".into()),
            affiliate_link: Some("https://aff.example.com".into()),
            competitors: Some(vec!["rival.com".into()]),
            attempt: 0,
        };
        assert!(job.validate().is_ok());
        let json = serde_json::to_string(&job).unwrap();
        let parsed: PageGenerationJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.page_id, 2);
        assert_eq!(parsed.safe_page_type.as_deref(), Some("review"));
    }
}
