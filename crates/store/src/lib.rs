//! `autoguard-store` is the durable-store (Postgres, "Store A" in the
//! design docs) access layer: one repository struct per aggregate, all
//! borrowing the same `PgPool`, composed behind a single [`Database`]
//! handle constructed once per process.

pub mod blacklist;
pub mod cloak_log;
pub mod error;
pub mod models;
pub mod offers;
pub mod pages;
pub mod prompts;
pub mod settings;
pub mod sources;
pub mod stats;
pub mod users;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub use error::{StoreError, StoreResult};

/// Composition root for every Postgres-backed repository. Construct
/// once at process startup and clone `Arc<Database>` into the pieces
/// that need it — the pool itself is already cheaply cloneable, but the
/// repositories borrow it, so callers reach them through the accessor
/// methods below rather than storing a `Users<'_>` across an await
/// point boundary that outlives the borrow.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Fatal(e.to_string()))
    }

    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn users(&self) -> users::Users<'_> {
        users::Users::new(&self.pool)
    }

    pub fn offers(&self) -> offers::Offers<'_> {
        offers::Offers::new(&self.pool)
    }

    pub fn pages(&self) -> pages::Pages<'_> {
        pages::Pages::new(&self.pool)
    }

    pub fn blacklist(&self) -> blacklist::Blacklist<'_> {
        blacklist::Blacklist::new(&self.pool)
    }

    pub fn sources(&self) -> sources::Sources<'_> {
        sources::Sources::new(&self.pool)
    }

    pub fn cloak_log(&self) -> cloak_log::CloakLog<'_> {
        cloak_log::CloakLog::new(&self.pool)
    }

    pub fn stats(&self) -> stats::Stats<'_> {
        stats::Stats::new(&self.pool)
    }

    pub fn prompts(&self) -> prompts::Prompts<'_> {
        prompts::Prompts::new(&self.pool)
    }

    pub fn settings(&self) -> settings::Settings<'_> {
        settings::Settings::new(&self.pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageStatus;

    #[test]
    fn page_satisfies_activation_rejects_draft() {
        assert!(!offers::page_satisfies_activation(PageStatus::Draft));
        assert!(offers::page_satisfies_activation(PageStatus::Generated));
        assert!(offers::page_satisfies_activation(PageStatus::Published));
    }

    #[test]
    fn scope_key_fragment_is_stable() {
        assert_eq!(models::Scope::Global.as_key_fragment(), "global");
        assert_eq!(models::Scope::User(42).as_key_fragment(), "user:42");
    }

    #[test]
    fn rule_family_table_names_cover_all_variants() {
        for family in models::RuleFamily::ALL {
            assert!(family.table_name().starts_with("blacklist_"));
        }
    }
}
