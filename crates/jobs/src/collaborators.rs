//! External collaborator interfaces the job handlers consume as
//! abstract capabilities — no concrete network client ships in this
//! crate, per the Non-goals. Grounded on the same trait-plus-null-impl
//! shape as the decision engine's `IpIntelligence`.

use async_trait::async_trait;

use crate::error::JobResult;

/// Fetched page contents plus the metadata the scrape handler persists
/// onto the offer.
#[derive(Debug, Clone, Default)]
pub struct ScrapedPage {
    pub html: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Raw bytes for any same-origin assets the scraper followed,
    /// keyed by their original relative path.
    pub assets: Vec<(String, Vec<u8>)>,
}

#[async_trait]
pub trait HttpScraper: Send + Sync {
    async fn fetch_page(&self, url: &str) -> JobResult<ScrapedPage>;
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> JobResult<String>;
}

/// DNS TXT lookup for the domain-verification job. `name` is the fully
/// qualified record name (`_autoguard.<firstLabel>[.<parentDomain>]`).
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve_txt(&self, name: &str) -> JobResult<Vec<String>>;
}

/// The custom-domain ping check: a GET to
/// `https://<customDomain>/__autoguard/ping`, expecting a 2xx status
/// and a trimmed body of exactly `ok`.
#[async_trait]
pub trait HttpVerifier: Send + Sync {
    async fn ping(&self, domain: &str) -> JobResult<bool>;
}

/// Safe placeholders wired into the composition root until a real
/// provider is configured — same role as the decision engine's
/// `NullIpIntelligence`. Scrape and generation have no safe "succeed
/// anyway" answer, so they fail every call; the two verification
/// collaborators fail *closed* (no record found / ping not confirmed)
/// rather than open, since an unverified custom domain must not route
/// cloaked traffic.
pub struct UnimplementedScraper;

#[async_trait]
impl HttpScraper for UnimplementedScraper {
    async fn fetch_page(&self, url: &str) -> JobResult<ScrapedPage> {
        Err(crate::error::JobError::Fatal(format!(
            "no HttpScraper configured, cannot fetch {url}"
        )))
    }
}

pub struct UnimplementedLlmClient;

#[async_trait]
impl LlmClient for UnimplementedLlmClient {
    async fn generate(&self, _prompt: &str) -> JobResult<String> {
        Err(crate::error::JobError::Fatal("no LlmClient configured".into()))
    }
}

pub struct ClosedDnsResolver;

#[async_trait]
impl DnsResolver for ClosedDnsResolver {
    async fn resolve_txt(&self, _name: &str) -> JobResult<Vec<String>> {
        Ok(Vec::new())
    }
}

pub struct ClosedHttpVerifier;

#[async_trait]
impl HttpVerifier for ClosedHttpVerifier {
    async fn ping(&self, _domain: &str) -> JobResult<bool> {
        Ok(false)
    }
}

#[cfg(test)]
pub mod fakes {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub struct FakeScraper {
        pub pages: HashMap<String, ScrapedPage>,
    }

    #[async_trait]
    impl HttpScraper for FakeScraper {
        async fn fetch_page(&self, url: &str) -> JobResult<ScrapedPage> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| crate::error::JobError::Transient(format!("no fake page for {url}")))
        }
    }

    pub struct FakeLlm {
        pub response: String,
    }

    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn generate(&self, _prompt: &str) -> JobResult<String> {
            Ok(self.response.clone())
        }
    }

    pub struct FakeDns {
        pub records: HashMap<String, Vec<String>>,
    }

    #[async_trait]
    impl DnsResolver for FakeDns {
        async fn resolve_txt(&self, name: &str) -> JobResult<Vec<String>> {
            Ok(self.records.get(name).cloned().unwrap_or_default())
        }
    }

    pub struct FakeVerifier {
        pub pingable: Mutex<HashMap<String, bool>>,
    }

    #[async_trait]
    impl HttpVerifier for FakeVerifier {
        async fn ping(&self, domain: &str) -> JobResult<bool> {
            Ok(*self.pingable.lock().unwrap().get(domain).unwrap_or(&false))
        }
    }
}
