//! `autoguard-fast` is the fast-lookup-store ("Store B") access layer:
//! a thin typed wrapper around an auto-reconnecting Redis connection
//! manager, exposing exactly the capability surface the decision
//! engine, materializer, and job pipeline need — get/set with TTL,
//! sets, sorted sets, hashes, lists with blocking pop, and multi-key
//! atomic scripts.

pub mod error;
pub mod hashes;
pub mod keys;
pub mod kv;
pub mod lists;
pub mod scripts;
pub mod sets;
pub mod sorted_sets;

use redis::aio::ConnectionManager;

pub use error::{FastResult, FastStoreError};

/// Clone-cheap handle to the fast lookup store. `ConnectionManager`
/// transparently reconnects on failure, so one instance is constructed
/// at process startup and cloned into every task that needs Redis.
#[derive(Clone)]
pub struct FastStore {
    manager: ConnectionManager,
}

impl FastStore {
    pub async fn connect(redis_url: &str) -> FastResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }

    pub async fn health_check(&self) -> FastResult<()> {
        let mut conn = self.conn();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_keys_match_the_documented_schema() {
        assert_eq!(keys::QUEUE_PAGE_GENERATION, "queue:pageGeneration");
        assert_eq!(keys::QUEUE_CLOAK_LOGS, "queue:cloakLogs");
        assert_eq!(keys::QUEUE_BLACKLIST_SYNC, "queue:blacklistSync");
    }

    #[test]
    fn blacklist_key_builders_match_the_documented_schema() {
        assert_eq!(keys::blacklist_ip("global"), "blacklist:ip:global");
        assert_eq!(keys::blacklist_ip("user:7"), "blacklist:ip:user:7");
        assert_eq!(
            keys::blacklist_isp_names("global"),
            "blacklist:isps:global:names"
        );
    }
}
