use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};
use crate::models::{PageRow, PageStatus, PageType};

/// Page CRUD. The at-most-one-row-per-`(offerId, pageType)` invariant is
/// enforced by a unique index in the migration; `upsert_draft` turns the
/// Postgres unique-violation into an idempotent no-op so job handlers
/// (which may be redelivered) don't need to special-case "already exists".
pub struct Pages<'a> {
    pool: &'a PgPool,
}

impl<'a> Pages<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> StoreResult<PageRow> {
        sqlx::query_as::<_, PageRow>("SELECT * FROM pages WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("page {id}")))
    }

    pub async fn find_for_offer(
        &self,
        offer_id: i64,
        page_type: PageType,
    ) -> StoreResult<Option<PageRow>> {
        Ok(sqlx::query_as::<_, PageRow>(
            "SELECT * FROM pages WHERE offer_id = $1 AND page_type = $2",
        )
        .bind(offer_id)
        .bind(page_type)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Creates the draft row a generation job will fill in, or returns
    /// the existing one untouched if it's already past `draft`.
    pub async fn upsert_draft(
        &self,
        offer_id: i64,
        page_type: PageType,
        content_source: crate::models::ContentSource,
    ) -> StoreResult<PageRow> {
        sqlx::query_as::<_, PageRow>(
            r#"
            INSERT INTO pages (offer_id, page_type, content_source, generation_params, status)
            VALUES ($1, $2, $3, '{}'::jsonb, 'draft')
            ON CONFLICT (offer_id, page_type) DO UPDATE SET offer_id = pages.offer_id
            RETURNING *
            "#,
        )
        .bind(offer_id)
        .bind(page_type)
        .bind(content_source)
        .fetch_one(self.pool)
        .await
        .map_err(StoreError::from)
    }

    pub async fn mark_generating(&self, id: i64) -> StoreResult<()> {
        self.set_status(id, PageStatus::Generating, None).await
    }

    pub async fn mark_generated(&self, id: i64, html_content: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE pages SET status = 'generated', html_content = $2,
                generation_error = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(html_content)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: i64, error: &str) -> StoreResult<()> {
        self.set_status(id, PageStatus::Failed, Some(error)).await
    }

    pub async fn mark_published(&self, id: i64) -> StoreResult<()> {
        sqlx::query(
            "UPDATE pages SET status = 'published', published_at = now(), updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn set_status(
        &self,
        id: i64,
        status: PageStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE pages SET status = $2, generation_error = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(error)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("page {id}")));
        }
        Ok(())
    }
}
