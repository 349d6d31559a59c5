use redis::AsyncCommands;

use crate::error::FastResult;
use crate::FastStore;

/// List operations — backs every queue. `brpoplpush` is the core of the
/// reliable-queue consume step: it blocks until a job is available and
/// atomically moves it into the `:processing` list in the same command,
/// so a worker crash between pop and ack leaves the job recoverable.
impl FastStore {
    pub async fn lpush(&self, key: &str, value: &str) -> FastResult<()> {
        let mut conn = self.conn();
        let _: () = conn.lpush(key, value).await?;
        Ok(())
    }

    pub async fn rpush(&self, key: &str, value: &str) -> FastResult<()> {
        let mut conn = self.conn();
        let _: () = conn.rpush(key, value).await?;
        Ok(())
    }

    pub async fn lrem(&self, key: &str, value: &str) -> FastResult<i64> {
        let mut conn = self.conn();
        Ok(conn.lrem(key, 1, value).await?)
    }

    pub async fn llen(&self, key: &str) -> FastResult<u64> {
        let mut conn = self.conn();
        Ok(conn.llen(key).await?)
    }

    pub async fn lrange_all(&self, key: &str) -> FastResult<Vec<String>> {
        let mut conn = self.conn();
        Ok(conn.lrange(key, 0, -1).await?)
    }

    /// Blocking `BRPOPLPUSH src -> dst`, with `timeout_secs == 0` meaning
    /// "block forever" in Redis semantics. Returns `None` on timeout so
    /// the caller's poll loop can check the shutdown signal and retry.
    pub async fn brpoplpush(
        &self,
        src: &str,
        dst: &str,
        timeout_secs: f64,
    ) -> FastResult<Option<String>> {
        let mut conn = self.conn();
        Ok(conn.brpoplpush(src, dst, timeout_secs).await?)
    }

    /// Drains every element of `src` into the tail of `dst`, in
    /// RPOPLPUSH order, used on worker startup to recover jobs stranded
    /// in `:processing` from a prior crash. Returns the count moved.
    pub async fn drain_into(&self, src: &str, dst: &str) -> FastResult<u64> {
        let mut conn = self.conn();
        let mut moved = 0u64;
        loop {
            let item: Option<String> = conn.rpoplpush(src, dst).await?;
            match item {
                Some(_) => moved += 1,
                None => break,
            }
        }
        Ok(moved)
    }

    /// Double-buffer + rename for list-shaped materialized forms (the UA
    /// pattern list) — same discipline as the set/hash variants.
    pub async fn replace_list_via_rename(&self, key: &str, values: &[String]) -> FastResult<()> {
        let mut conn = self.conn();
        if values.is_empty() {
            let _: () = conn.del(key).await?;
            return Ok(());
        }
        let staging = format!("{key}:next");
        let mut pipe = redis::pipe();
        pipe.atomic().del(&staging).ignore();
        for value in values {
            pipe.rpush(&staging, value).ignore();
        }
        pipe.rename(&staging, key).ignore();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Drains up to `max` elements from the left of `key` — the cloak-log
    /// queue flusher's batch-read primitive. Not blocking; returns
    /// fewer than `max` (including zero) when the list is short.
    pub async fn lpop_batch(&self, key: &str, max: usize) -> FastResult<Vec<String>> {
        let mut conn = self.conn();
        let mut batch = Vec::with_capacity(max);
        for _ in 0..max {
            let item: Option<String> = conn.lpop(key, None).await?;
            match item {
                Some(v) => batch.push(v),
                None => break,
            }
        }
        Ok(batch)
    }
}
