use redis::AsyncCommands;

use crate::error::FastResult;
use crate::FastStore;

/// Hash operations — backs `blacklist:isps:<scope>:names` (ASN -> ISP
/// name) and `blacklist:geos:<scope>` (country[:region] -> block type).
impl FastStore {
    pub async fn hset(&self, key: &str, field: &str, value: &str) -> FastResult<()> {
        let mut conn = self.conn();
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    pub async fn hdel(&self, key: &str, field: &str) -> FastResult<()> {
        let mut conn = self.conn();
        let _: () = conn.hdel(key, field).await?;
        Ok(())
    }

    pub async fn hget(&self, key: &str, field: &str) -> FastResult<Option<String>> {
        let mut conn = self.conn();
        Ok(conn.hget(key, field).await?)
    }

    pub async fn hgetall(&self, key: &str) -> FastResult<std::collections::HashMap<String, String>> {
        let mut conn = self.conn();
        Ok(conn.hgetall(key).await?)
    }

    /// Double-buffer + rename, same discipline as
    /// [`FastStore::replace_set_via_rename`] but for hash-shaped
    /// materialized forms (geo block types, ASN name maps).
    pub async fn replace_hash_via_rename(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> FastResult<()> {
        let mut conn = self.conn();
        if fields.is_empty() {
            let _: () = conn.del(key).await?;
            return Ok(());
        }
        let staging = format!("{key}:next");
        let mut pipe = redis::pipe();
        pipe.atomic().del(&staging).ignore();
        for (field, value) in fields {
            pipe.hset(&staging, field, value).ignore();
        }
        pipe.rename(&staging, key).ignore();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}
