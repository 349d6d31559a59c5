use redis::Script;

use crate::error::{FastResult, FastStoreError};
use crate::FastStore;

/// `LREM dead 1 oldJob; if removed == 1 then LPUSH queue newJob; return removed`
/// — the DLQ requeue operation spec'd as a single multi-key atomic
/// script so a concurrent admin retry can never both remove the dead
/// entry and fail to re-enqueue it.
static DLQ_REQUEUE: Script = Script::new(
    r#"
    local removed = redis.call('LREM', KEYS[1], 1, ARGV[1])
    if removed == 1 then
        redis.call('LPUSH', KEYS[2], ARGV[2])
    end
    return removed
    "#,
);

/// Promotes every delayed-queue member whose score is `<= ARGV[1]` into
/// the main queue, atomically with respect to the scheduler's own
/// concurrent promotion tick and any in-flight `ZADD` retry scheduling.
static PROMOTE_DUE: Script = Script::new(
    r#"
    local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
    for _, member in ipairs(due) do
        redis.call('ZREM', KEYS[1], member)
        redis.call('LPUSH', KEYS[2], member)
    end
    return #due
    "#,
);

/// Deletes the cached prompt content atomically with respect to any
/// concurrent `GET` — paired with `activate_version_exclusive`'s DB
/// transaction so a reader never observes a cache hit for a version
/// that's no longer active.
static INVALIDATE_PROMPT_CACHE: Script = Script::new(
    r#"
    redis.call('DEL', KEYS[1])
    return 1
    "#,
);

impl FastStore {
    /// Returns the number of jobs removed from the dead-letter queue
    /// (0 if `old_job` wasn't present — already requeued or never dead).
    pub async fn dlq_requeue(
        &self,
        dead_key: &str,
        queue_key: &str,
        old_job: &str,
        new_job: &str,
    ) -> FastResult<i64> {
        let mut conn = self.conn();
        let removed: i64 = DLQ_REQUEUE
            .key(dead_key)
            .key(queue_key)
            .arg(old_job)
            .arg(new_job)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| FastStoreError::Script(e.to_string()))?;
        Ok(removed)
    }

    /// Moves due members from `delayed_key` into `queue_key`. `now_ms` is
    /// the epoch millisecond cutoff — members scored `<= now_ms` move.
    /// Returns the number promoted.
    pub async fn promote_due(
        &self,
        delayed_key: &str,
        queue_key: &str,
        now_ms: i64,
    ) -> FastResult<i64> {
        let mut conn = self.conn();
        let promoted: i64 = PROMOTE_DUE
            .key(delayed_key)
            .key(queue_key)
            .arg(now_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| FastStoreError::Script(e.to_string()))?;
        Ok(promoted)
    }

    pub async fn invalidate_prompt_cache(&self, prompt_key: &str) -> FastResult<()> {
        let mut conn = self.conn();
        let _: i64 = INVALIDATE_PROMPT_CACHE
            .key(prompt_key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| FastStoreError::Script(e.to_string()))?;
        Ok(())
    }
}
