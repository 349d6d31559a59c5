//! The scheduler binary's periodic ticks: blacklist re-materialize,
//! expiry cleanup, stats aggregation plus cloak-log drain, delayed-queue
//! promotion, cloak-log retention sweep, and due external-source
//! enqueueing. Each tick runs on its own `tokio::time::interval` inside
//! one `tokio::select!`, the same one-process-many-ticks shape the
//! blacklist crate's materializer expects to be driven by.

use std::sync::Arc;

use autoguard_blacklist::Materializer;
use autoguard_config::Config;
use autoguard_fast::{keys, FastStore};
use autoguard_store::settings::defaults;
use autoguard_store::Database;
use chrono::Utc;
use serde_json::json;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::queue::ReliableQueue;

const CLOAK_LOG_DRAIN_BATCH: usize = 500;

pub struct Scheduler {
    store: Arc<Database>,
    fast: Arc<FastStore>,
    config: Arc<Config>,
    materializer: Arc<Materializer>,
    page_queue: ReliableQueue,
    source_queue: ReliableQueue,
    domain_queue: ReliableQueue,
}

impl Scheduler {
    pub fn new(
        store: Arc<Database>,
        fast: Arc<FastStore>,
        config: Arc<Config>,
        materializer: Arc<Materializer>,
    ) -> Self {
        let page_queue = ReliableQueue::new(
            fast.clone(),
            keys::QUEUE_PAGE_GENERATION,
            config.max_job_attempts,
        );
        let source_queue = ReliableQueue::new(
            fast.clone(),
            keys::QUEUE_BLACKLIST_SYNC,
            config.max_job_attempts,
        );
        let domain_queue = ReliableQueue::new(fast.clone(), "queue:domainVerify", config.max_job_attempts);
        Self {
            store,
            fast,
            config,
            materializer,
            page_queue,
            source_queue,
            domain_queue,
        }
    }

    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut materialize_tick = ticking(self.config.blacklist_sync_interval);
        let mut expiry_tick = ticking(self.config.expiry_cleanup_interval);
        let mut stats_tick = ticking(self.config.stats_aggregation_interval);
        let mut delayed_tick = ticking(self.config.delayed_promotion_interval);
        let mut retention_tick = ticking(self.config.retention_sweep_interval);
        let mut source_tick = ticking(self.config.source_scheduling_interval);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("scheduler shutting down");
                    return;
                }
                _ = materialize_tick.tick() => self.run_tick("materializeAll", self.materialize_all()).await,
                _ = expiry_tick.tick() => self.run_tick("expiryCleanup", self.expiry_cleanup()).await,
                _ = stats_tick.tick() => self.run_tick("statsAggregation", self.stats_and_drain()).await,
                _ = delayed_tick.tick() => self.run_tick("delayedPromotion", self.promote_delayed()).await,
                _ = retention_tick.tick() => self.run_tick("retentionSweep", self.retention_sweep()).await,
                _ = source_tick.tick() => self.run_tick("sourceScheduling", self.schedule_due_sources()).await,
            }
        }
    }

    async fn run_tick<F>(&self, name: &'static str, fut: F)
    where
        F: std::future::Future<Output = anyhow::Result<()>>,
    {
        if let Err(error) = fut.await {
            error!(tick = name, %error, "scheduler tick failed");
        }
    }

    async fn materialize_all(&self) -> anyhow::Result<()> {
        let report = self.materializer.materialize_all().await?;
        info!(has_errors = report.has_errors(), "blacklist materialize-all tick complete");
        Ok(())
    }

    async fn expiry_cleanup(&self) -> anyhow::Result<()> {
        let report = self.materializer.cleanup_expired().await?;
        info!(has_errors = report.has_errors(), "expiry cleanup tick complete");
        Ok(())
    }

    /// Drains the cloak-log queue into the authoritative store in
    /// batches, then recomputes today's (and, on the UTC boundary,
    /// yesterday's) daily_stats rows for every pair that logged traffic.
    async fn stats_and_drain(&self) -> anyhow::Result<()> {
        let mut drained = 0u64;
        loop {
            let batch = self.fast.lpop_batch(keys::QUEUE_CLOAK_LOGS, CLOAK_LOG_DRAIN_BATCH).await?;
            if batch.is_empty() {
                break;
            }
            let entries: Vec<_> = batch
                .iter()
                .filter_map(|raw| match serde_json::from_str(raw) {
                    Ok(entry) => Some(entry),
                    Err(error) => {
                        warn!(%error, "dropping unparseable cloak-log entry");
                        None
                    }
                })
                .collect();
            let inserted = self.store.cloak_log().insert_batch(&entries).await?;
            drained += inserted;
            if batch.len() < CLOAK_LOG_DRAIN_BATCH {
                break;
            }
        }
        if drained > 0 {
            info!(drained, "cloak-log drain tick complete");
        }

        let today = Utc::now().date_naive();
        let pairs = self.store.stats().active_pairs_for_day(today).await?;
        for (user_id, offer_id) in pairs {
            self.store.stats().recompute_for_day(user_id, offer_id, today).await?;
        }
        Ok(())
    }

    async fn promote_delayed(&self) -> anyhow::Result<()> {
        for queue in [&self.page_queue, &self.source_queue, &self.domain_queue] {
            let promoted = queue.promote_due().await?;
            if promoted > 0 {
                info!(queue = queue.main_key(), promoted, "delayed jobs promoted");
            }
        }
        Ok(())
    }

    async fn retention_sweep(&self) -> anyhow::Result<()> {
        let retention_days = self
            .store
            .settings()
            .get(defaults::CLOAK_LOG_RETENTION_DAYS)
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults::CLOAK_LOG_RETENTION_DAYS_DEFAULT as i64);
        let deleted = self.store.cloak_log().delete_older_than(retention_days).await?;
        if deleted > 0 {
            info!(deleted, retention_days, "cloak-log retention sweep complete");
        }
        Ok(())
    }

    async fn schedule_due_sources(&self) -> anyhow::Result<()> {
        let due = self.store.sources().list_due().await?;
        for source in due {
            self.store.sources().mark_syncing(source.id).await?;
            let payload = json!({
                "sourceId": source.id,
                "sourceName": source.name,
                "sourceType": source.source_type,
                "url": source.url,
                "triggeredBy": "scheduler",
                "triggeredAt": Utc::now(),
                "attempt": 0,
            });
            self.source_queue.enqueue(&payload.to_string()).await?;
        }
        Ok(())
    }
}

fn ticking(period: std::time::Duration) -> tokio::time::Interval {
    let mut interval = interval(period.max(std::time::Duration::from_millis(100)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
