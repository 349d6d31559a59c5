//! The reliable-queue protocol atop the fast lookup store's lists and
//! sorted sets: `lpush`/`brpoplpush`/`lrem` for the main path, `zadd`
//! for delayed retry, and the DLQ requeue script for admin recovery.
//! Parameterized by queue name so one implementation serves page
//! generation and source sync alike.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use autoguard_fast::{keys::QueueKeys, FastStore};
use rand::Rng;
use tracing::{info, warn};

use crate::error::{JobError, JobResult};

/// Anything with a mutable `attempt` counter — every job payload shape
/// carries one so the retry path can bump it before re-enqueueing.
pub trait JobAttempt {
    fn attempt(&self) -> u32;
    fn set_attempt(&mut self, attempt: u32);
}

impl JobAttempt for crate::job::PageGenerationJob {
    fn attempt(&self) -> u32 {
        self.attempt
    }
    fn set_attempt(&mut self, attempt: u32) {
        self.attempt = attempt;
    }
}

impl JobAttempt for crate::job::SourceSyncJob {
    fn attempt(&self) -> u32 {
        self.attempt
    }
    fn set_attempt(&mut self, attempt: u32) {
        self.attempt = attempt;
    }
}

impl JobAttempt for crate::job::DomainVerifyJob {
    fn attempt(&self) -> u32 {
        self.attempt
    }
    fn set_attempt(&mut self, attempt: u32) {
        self.attempt = attempt;
    }
}

pub enum FailOutcome {
    Retried { delay: Duration },
    DeadLettered,
}

/// `min(60s * 2^attempt, 1h)`, jittered uniformly within +/-20% so a
/// burst of same-cause failures doesn't retry in lockstep.
pub fn backoff_for_attempt(attempt: u32) -> Duration {
    let base_secs = 60u64.saturating_mul(1u64 << attempt.min(10));
    let capped_secs = base_secs.min(3600);
    let jitter_frac = rand::rng().random_range(0.8..1.2);
    Duration::from_secs_f64(capped_secs as f64 * jitter_frac)
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as i64
}

/// One reliable queue: a main list, its `:processing`/`:delayed`/`:dead`
/// companions, and a fixed `max_attempts` ceiling.
pub struct ReliableQueue {
    fast: Arc<FastStore>,
    keys: QueueKeys,
    max_attempts: u32,
}

impl ReliableQueue {
    pub fn new(fast: Arc<FastStore>, main_queue: &'static str, max_attempts: u32) -> Self {
        Self {
            fast,
            keys: QueueKeys::for_queue(main_queue),
            max_attempts,
        }
    }

    pub fn main_key(&self) -> &str {
        &self.keys.main
    }

    pub async fn enqueue(&self, payload: &str) -> JobResult<()> {
        self.fast.lpush(&self.keys.main, payload).await?;
        Ok(())
    }

    pub async fn enqueue_delayed(&self, payload: &str, due_at_ms: i64) -> JobResult<()> {
        self.fast.zadd(&self.keys.delayed, payload, due_at_ms).await?;
        Ok(())
    }

    /// `BRPOPLPUSH main -> processing`. A `None` return means the poll
    /// timed out with nothing available — the caller's loop re-checks
    /// its shutdown signal and polls again.
    pub async fn consume(&self, timeout_secs: f64) -> JobResult<Option<String>> {
        Ok(self.fast.brpoplpush(&self.keys.main, &self.keys.processing, timeout_secs).await?)
    }

    pub async fn ack(&self, payload: &str) -> JobResult<()> {
        self.fast.lrem(&self.keys.processing, payload).await?;
        Ok(())
    }

    /// Moves everything stranded in `:processing` back to the tail of
    /// the main queue. Run once on worker startup; returns the count
    /// recovered so the caller can log it.
    pub async fn recover_stuck(&self) -> JobResult<u64> {
        let recovered = self.fast.drain_into(&self.keys.processing, &self.keys.main).await?;
        if recovered > 0 {
            warn!(queue = %self.keys.main, recovered, "recovered stuck jobs from processing list");
        }
        Ok(recovered)
    }

    /// The scheduler's delayed-queue promotion tick.
    pub async fn promote_due(&self) -> JobResult<i64> {
        Ok(self.fast.promote_due(&self.keys.delayed, &self.keys.main, now_ms()).await?)
    }

    /// Applies the job-worker propagation policy to a failed job: bumps
    /// `attempt`, and either schedules a delayed retry or moves it to
    /// the dead-letter queue with `{failedAt, error}` annotation.
    /// `old_payload` must be the exact JSON string that is currently
    /// sitting in `:processing` so it can be `LREM`'d.
    pub async fn fail<T>(
        &self,
        old_payload: &str,
        mut job: T,
        error: &JobError,
    ) -> JobResult<FailOutcome>
    where
        T: JobAttempt + serde::Serialize,
    {
        self.fast.lrem(&self.keys.processing, old_payload).await?;

        // The propagation policy increments `attempt` in the job body
        // before deciding retry-vs-dead-letter, so a DLQ'd job's body
        // reflects the attempt count that exhausted the budget.
        let next_attempt = job.attempt() + 1;
        job.set_attempt(next_attempt);
        let new_payload = serde_json::to_string(&job)?;

        if !error.is_retryable() || next_attempt >= self.max_attempts {
            self.dead_letter(&new_payload, error).await?;
            return Ok(FailOutcome::DeadLettered);
        }

        let delay = backoff_for_attempt(next_attempt);
        let due_at_ms = now_ms() + delay.as_millis() as i64;
        self.fast.zadd(&self.keys.delayed, &new_payload, due_at_ms).await?;
        info!(queue = %self.keys.main, attempt = next_attempt, delay_secs = delay.as_secs(), "job scheduled for delayed retry");
        Ok(FailOutcome::Retried { delay })
    }

    async fn dead_letter(&self, old_payload: &str, error: &JobError) -> JobResult<()> {
        let mut value: serde_json::Value = serde_json::from_str(old_payload)?;
        if let serde_json::Value::Object(ref mut map) = value {
            map.insert("failedAt".into(), serde_json::Value::String(chrono::Utc::now().to_rfc3339()));
            map.insert("error".into(), serde_json::Value::String(error.to_string()));
        }
        let dead_payload = serde_json::to_string(&value)?;
        self.fast.lpush(&self.keys.dead, &dead_payload).await?;
        warn!(queue = %self.keys.main, error = %error, "job moved to dead-letter queue");
        Ok(())
    }

    /// Admin DLQ requeue: atomically removes `old_dead_job` from
    /// `:dead` and re-pushes a fresh copy with `attempt` reset to 0.
    pub async fn dlq_requeue(&self, old_dead_job: &str) -> JobResult<bool> {
        let mut value: serde_json::Value = serde_json::from_str(old_dead_job)?;
        if let serde_json::Value::Object(ref mut map) = value {
            map.remove("failedAt");
            map.remove("error");
            map.insert("attempt".into(), serde_json::Value::from(0));
        }
        let new_job = serde_json::to_string(&value)?;
        let removed = self.fast.dlq_requeue(&self.keys.dead, &self.keys.main, old_dead_job, &new_job).await?;
        Ok(removed == 1)
    }

    pub async fn dead_letters(&self) -> JobResult<Vec<String>> {
        Ok(self.fast.lrange_all(&self.keys.dead).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_and_caps_at_one_hour() {
        let first = backoff_for_attempt(0);
        assert!(first.as_secs() >= 48 && first.as_secs() <= 72); // ~60s +/-20%

        let late = backoff_for_attempt(20);
        assert!(late.as_secs() <= 3600 * 12 / 10); // capped base, +20% jitter ceiling
        assert!(late.as_secs() >= 3600 * 8 / 10); // capped base, -20% jitter floor
    }
}
