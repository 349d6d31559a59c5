use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::FastResult;
use crate::FastStore;

/// Plain string get/set/del with optional TTL, plus JSON convenience
/// wrappers — the routing cache (`offer:by*`) and `prompt:<name>` both
/// store JSON/plain strings with a TTL.
impl FastStore {
    pub async fn get(&self, key: &str) -> FastResult<Option<String>> {
        let mut conn = self.conn();
        Ok(conn.get(key).await?)
    }

    pub async fn set(&self, key: &str, value: &str) -> FastResult<()> {
        let mut conn = self.conn();
        conn.set(key, value).await?;
        Ok(())
    }

    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> FastResult<()> {
        let mut conn = self.conn();
        conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    pub async fn del(&self, key: &str) -> FastResult<()> {
        let mut conn = self.conn();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> FastResult<bool> {
        let mut conn = self.conn();
        Ok(conn.exists(key).await?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> FastResult<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> FastResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }

    pub async fn set_json_ex<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> FastResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set_ex(key, &raw, ttl_secs).await
    }
}
