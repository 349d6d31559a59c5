use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct IpIntelResult {
    pub is_datacenter: bool,
    pub is_vpn: bool,
    pub is_proxy: bool,
    pub is_tor: bool,
    pub country: Option<String>,
    pub city: Option<String>,
    pub isp: Option<String>,
    pub asn: Option<i64>,
}

/// L2's collaborator. `lookup` receives the remaining request budget as
/// `deadline` — implementations must respect it and return in time, or
/// the caller's own `tokio::time::timeout` wrapper will cancel the
/// call and L2 proceeds without a score contribution.
#[async_trait]
pub trait IpIntelligence: Send + Sync {
    async fn lookup(&self, ip: &str, deadline: Duration) -> Result<IpIntelResult, String>;
}

/// A collaborator that always returns a clean result instantly — used
/// in tests and as a safe placeholder until a real provider is wired
/// into the composition root.
pub struct NullIpIntelligence;

#[async_trait]
impl IpIntelligence for NullIpIntelligence {
    async fn lookup(&self, _ip: &str, _deadline: Duration) -> Result<IpIntelResult, String> {
        Ok(IpIntelResult::default())
    }
}
