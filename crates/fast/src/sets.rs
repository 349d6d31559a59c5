use redis::AsyncCommands;

use crate::error::FastResult;
use crate::FastStore;

/// Set operations — backs `blacklist:ip:<scope>` and `blacklist:isps:<scope>`.
impl FastStore {
    pub async fn sadd(&self, key: &str, member: &str) -> FastResult<()> {
        let mut conn = self.conn();
        let _: () = conn.sadd(key, member).await?;
        Ok(())
    }

    pub async fn sadd_many(&self, key: &str, members: &[String]) -> FastResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let _: () = conn.sadd(key, members).await?;
        Ok(())
    }

    pub async fn srem(&self, key: &str, member: &str) -> FastResult<()> {
        let mut conn = self.conn();
        let _: () = conn.srem(key, member).await?;
        Ok(())
    }

    pub async fn smembers(&self, key: &str) -> FastResult<Vec<String>> {
        let mut conn = self.conn();
        Ok(conn.smembers(key).await?)
    }

    pub async fn sismember(&self, key: &str, member: &str) -> FastResult<bool> {
        let mut conn = self.conn();
        Ok(conn.sismember(key, member).await?)
    }

    /// Replaces the set's contents in one round trip: `DEL` then `SADD`.
    /// Acceptable per the materializer's atomicity contract only for the
    /// delete-then-fill strategy — prefer [`FastStore::replace_set_via_rename`]
    /// when the caller needs the stronger double-buffer guarantee.
    pub async fn replace_set(&self, key: &str, members: &[String]) -> FastResult<()> {
        let mut conn = self.conn();
        let _: () = redis::pipe()
            .atomic()
            .del(key)
            .ignore()
            .sadd(key, members)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Double-buffer + rename: write into `<key>:next`, then `RENAME`
    /// over `key`. Readers never observe a half-populated set — `RENAME`
    /// is a single atomic Redis operation, so this is the preferred
    /// strategy the materializer uses over plain delete-then-fill.
    pub async fn replace_set_via_rename(&self, key: &str, members: &[String]) -> FastResult<()> {
        let mut conn = self.conn();
        if members.is_empty() {
            // RENAME requires the source key to exist; an empty
            // materialized set is just an absent key.
            let _: () = conn.del(key).await?;
            return Ok(());
        }
        let staging = format!("{key}:next");
        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(&staging)
            .ignore()
            .sadd(&staging, members)
            .ignore()
            .rename(&staging, key)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}
