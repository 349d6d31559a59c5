//! Process-wide configuration, parsed once at composition-root startup
//! into a typed [`Config`] and handed down via dependency injection —
//! no config-file DSL, matching the teacher's `std::env::var(...)` at
//! the edge of `main` convention (`agentkern-treasury::lock`) rather
//! than a process-wide mutable singleton.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything every binary (`decisiond`, `workerd`, `schedulerd`) needs
/// to construct its dependency graph. Scheduler intervals and worker
/// concurrency are overridable defaults per `spec.md` §4.E/§6; decision
/// thresholds are NOT here — those live in the authoritative store's
/// `settings` table and are hot-reloaded, per spec.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub pages_dir: PathBuf,
    /// Owned by the external session/auth collaborator; the core only
    /// threads it through the composition root because it is process-wide.
    pub jwt_secret: String,
    pub health_port: u16,

    pub worker_concurrency: usize,
    pub blacklist_sync_interval: Duration,
    pub expiry_cleanup_interval: Duration,
    pub stats_aggregation_interval: Duration,
    pub delayed_promotion_interval: Duration,
    pub retention_sweep_interval: Duration,
    pub settings_refresh_interval: Duration,
    pub source_scheduling_interval: Duration,

    pub scrape_job_timeout: Duration,
    pub llm_job_timeout: Duration,
    pub dns_lookup_timeout: Duration,
    pub http_verify_timeout: Duration,
    pub shutdown_grace_period: Duration,

    pub max_job_attempts: u32,
}

impl Config {
    /// Reads every variable from the process environment, falling back
    /// to the documented defaults for anything optional. `DATABASE_URL`
    /// and `REDIS_URL` are the only required variables.
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            database_url: require("DATABASE_URL")?,
            redis_url: require("REDIS_URL")?,
            pages_dir: PathBuf::from(optional("PAGES_DIR", "./pages")),
            jwt_secret: optional("JWT_SECRET", "dev-secret-change-me"),
            health_port: parse_optional("HEALTH_PORT", 8080)?,

            worker_concurrency: parse_optional("WORKER_CONCURRENCY", 2)?,
            blacklist_sync_interval: secs("BLACKLIST_SYNC_INTERVAL_SECS", 300)?,
            expiry_cleanup_interval: secs("EXPIRY_CLEANUP_INTERVAL_SECS", 3600)?,
            stats_aggregation_interval: secs("STATS_AGGREGATION_INTERVAL_SECS", 300)?,
            delayed_promotion_interval: secs("DELAYED_PROMOTION_INTERVAL_SECS", 1)?,
            retention_sweep_interval: secs("RETENTION_SWEEP_INTERVAL_SECS", 86_400)?,
            settings_refresh_interval: secs("SETTINGS_REFRESH_INTERVAL_SECS", 30)?,
            source_scheduling_interval: secs("SOURCE_SCHEDULING_INTERVAL_SECS", 60)?,

            scrape_job_timeout: secs("SCRAPE_JOB_TIMEOUT_SECS", 30)?,
            llm_job_timeout: secs("LLM_JOB_TIMEOUT_SECS", 60)?,
            dns_lookup_timeout: secs("DNS_LOOKUP_TIMEOUT_SECS", 5)?,
            http_verify_timeout: secs("HTTP_VERIFY_TIMEOUT_SECS", 5)?,
            shutdown_grace_period: secs("SHUTDOWN_GRACE_PERIOD_SECS", 30)?,

            max_job_attempts: parse_optional("MAX_JOB_ATTEMPTS", 5)?,
        })
    }
}

fn require(key: &'static str) -> ConfigResult<String> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn optional(key: &'static str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_optional<T: std::str::FromStr>(key: &'static str, default: T) -> ConfigResult<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw.clone())),
        Err(_) => Ok(default),
    }
}

fn secs(key: &'static str, default_secs: u64) -> ConfigResult<Duration> {
    parse_optional(key, default_secs).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_optional_falls_back_on_missing_var() {
        std::env::remove_var("AUTOGUARD_TEST_UNSET_VAR");
        let value: u32 = parse_optional("AUTOGUARD_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_optional_rejects_invalid_value() {
        std::env::set_var("AUTOGUARD_TEST_BAD_VAR", "not-a-number");
        let result: ConfigResult<u32> = parse_optional("AUTOGUARD_TEST_BAD_VAR", 1);
        assert!(result.is_err());
        std::env::remove_var("AUTOGUARD_TEST_BAD_VAR");
    }
}
