//! Read-through cache for active prompt content, keyed `prompt:<name>`
//! with a 1h TTL per the fast-lookup-store key schema, and the
//! companion write path that activates a version in the authoritative
//! store and invalidates the cache entry in the same call — per
//! spec.md §5, prompt activation is atomic in A, "followed by cache
//! invalidation of key `prompt:<name>`".

use autoguard_fast::{keys, FastStore};
use autoguard_store::models::PromptVersionRow;
use autoguard_store::{Database, StoreError, StoreResult};

const PROMPT_CACHE_TTL_SECS: u64 = 3600;

/// Returns the active version's content for `prompt_name`, preferring
/// the fast-store cache and falling back to the authoritative store on
/// a miss. `None` means no active version exists (callers fall back to
/// an embedded default template).
pub async fn active_content(
    store: &Database,
    fast: &FastStore,
    prompt_name: &str,
) -> StoreResult<Option<String>> {
    let cache_key = keys::prompt(prompt_name);
    if let Ok(Some(cached)) = fast.get(&cache_key).await {
        return Ok(Some(cached));
    }

    let version = store.prompts().active_version_by_name(prompt_name).await?;
    if let Some(version) = &version {
        // Best-effort warm; a failed cache write just means the next
        // read falls through to the database again.
        let _ = fast.set_ex(&cache_key, &version.content, PROMPT_CACHE_TTL_SECS).await;
    }
    Ok(version.map(|v| v.content))
}

/// Activates `version_id` under `prompt_id` and invalidates the cached
/// content for `prompt_name` in the same call, so a concurrent reader
/// never observes a cache hit for a version that's no longer active.
pub async fn activate_and_invalidate(
    store: &Database,
    fast: &FastStore,
    prompt_id: i64,
    version_id: i64,
    prompt_name: &str,
) -> StoreResult<PromptVersionRow> {
    let activated = store
        .prompts()
        .activate_version_exclusive(prompt_id, version_id)
        .await?;
    fast.invalidate_prompt_cache(&keys::prompt(prompt_name))
        .await
        .map_err(|e| StoreError::Fatal(format!("prompt cache invalidation failed: {e}")))?;
    Ok(activated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_cache_key_matches_documented_schema() {
        assert_eq!(keys::prompt("safe-page-review"), "prompt:safe-page-review");
    }
}
