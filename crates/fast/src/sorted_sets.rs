use redis::AsyncCommands;

use crate::error::FastResult;
use crate::FastStore;

/// Sorted-set operations — backs the delayed-retry queues, where the
/// score is the due-at epoch millisecond.
impl FastStore {
    pub async fn zadd(&self, key: &str, member: &str, score: i64) -> FastResult<()> {
        let mut conn = self.conn();
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    pub async fn zrem(&self, key: &str, member: &str) -> FastResult<()> {
        let mut conn = self.conn();
        let _: () = conn.zrem(key, member).await?;
        Ok(())
    }

    pub async fn zcard(&self, key: &str) -> FastResult<u64> {
        let mut conn = self.conn();
        Ok(conn.zcard(key).await?)
    }
}
