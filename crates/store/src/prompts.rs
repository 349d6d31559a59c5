use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};
use crate::models::{PromptRow, PromptVersionRow};

/// Prompt templates and their versions. Exactly one version per prompt
/// may have `is_active = true` at a time — `activate_version_exclusive`
/// is the only path that's allowed to flip it, inside one transaction.
pub struct Prompts<'a> {
    pool: &'a PgPool,
}

impl<'a> Prompts<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_name(&self, name: &str) -> StoreResult<Option<PromptRow>> {
        Ok(
            sqlx::query_as::<_, PromptRow>("SELECT * FROM prompts WHERE name = $1")
                .bind(name)
                .fetch_optional(self.pool)
                .await?,
        )
    }

    pub async fn create(&self, name: &str) -> StoreResult<PromptRow> {
        sqlx::query_as::<_, PromptRow>("INSERT INTO prompts (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(e, format!("prompt '{name}' already exists")))
    }

    pub async fn active_version(&self, prompt_id: i64) -> StoreResult<Option<PromptVersionRow>> {
        Ok(sqlx::query_as::<_, PromptVersionRow>(
            "SELECT * FROM prompt_versions WHERE prompt_id = $1 AND is_active = true",
        )
        .bind(prompt_id)
        .fetch_optional(self.pool)
        .await?)
    }

    pub async fn active_version_by_name(
        &self,
        prompt_name: &str,
    ) -> StoreResult<Option<PromptVersionRow>> {
        Ok(sqlx::query_as::<_, PromptVersionRow>(
            r#"
            SELECT pv.* FROM prompt_versions pv
            JOIN prompts p ON p.id = pv.prompt_id
            WHERE p.name = $1 AND pv.is_active = true
            "#,
        )
        .bind(prompt_name)
        .fetch_optional(self.pool)
        .await?)
    }

    pub async fn list_versions(&self, prompt_id: i64) -> StoreResult<Vec<PromptVersionRow>> {
        Ok(sqlx::query_as::<_, PromptVersionRow>(
            "SELECT * FROM prompt_versions WHERE prompt_id = $1 ORDER BY created_at DESC",
        )
        .bind(prompt_id)
        .fetch_all(self.pool)
        .await?)
    }

    pub async fn add_version(&self, prompt_id: i64, content: &str) -> StoreResult<PromptVersionRow> {
        sqlx::query_as::<_, PromptVersionRow>(
            "INSERT INTO prompt_versions (prompt_id, content, is_active) VALUES ($1, $2, false) \
             RETURNING *",
        )
        .bind(prompt_id)
        .bind(content)
        .fetch_one(self.pool)
        .await
        .map_err(StoreError::from)
    }

    /// Deactivates every other version of the same prompt and activates
    /// `version_id`, in one transaction — the "exactly one active
    /// version" invariant never observes two active rows.
    pub async fn activate_version_exclusive(
        &self,
        prompt_id: i64,
        version_id: i64,
    ) -> StoreResult<PromptVersionRow> {
        let mut tx = self.pool.begin().await?;

        let belongs: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM prompt_versions WHERE id = $1 AND prompt_id = $2",
        )
        .bind(version_id)
        .bind(prompt_id)
        .fetch_optional(&mut *tx)
        .await?;
        if belongs.is_none() {
            return Err(StoreError::NotFound(format!(
                "prompt version {version_id} for prompt {prompt_id}"
            )));
        }

        sqlx::query("UPDATE prompt_versions SET is_active = false WHERE prompt_id = $1")
            .bind(prompt_id)
            .execute(&mut *tx)
            .await?;

        let activated = sqlx::query_as::<_, PromptVersionRow>(
            "UPDATE prompt_versions SET is_active = true WHERE id = $1 RETURNING *",
        )
        .bind(version_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(activated)
    }
}
