use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};
use crate::models::{UserRole, UserRow, UserStatus};

/// User CRUD plus the cascade-delete into `offers` (and everything an
/// offer owns) that the data model's invariant requires.
pub struct Users<'a> {
    pool: &'a PgPool,
}

impl<'a> Users<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, email: &str, password_hash: &str) -> StoreResult<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, password_hash, role, status)
            VALUES (lower($1), $2, 'user', 'active')
            RETURNING id, email, password_hash, role, status, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, format!("email '{email}' already registered")))
    }

    pub async fn find_by_id(&self, id: i64) -> StoreResult<UserRow> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, role, status, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, role, status, created_at, updated_at \
             FROM users WHERE email = lower($1)",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_status(&self, id: i64, status: UserStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    pub async fn set_role(&self, id: i64, role: UserRole) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET role = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    /// Deletes a user and cascades into their offers, pages, and
    /// user-scoped blacklist rows inside a single transaction. The
    /// fast-lookup-store side of the cascade (routing keys, `user:<id>`
    /// blacklist scopes) is the caller's responsibility — it is cleaned
    /// up by the next scheduled materialize, same as any other
    /// on-demand delta that isn't mirrored synchronously.
    pub async fn delete_cascade(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM pages WHERE offer_id IN (SELECT id FROM offers WHERE user_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        for family_table in [
            "blacklist_ips",
            "blacklist_ip_ranges",
            "blacklist_uas",
            "blacklist_isps",
            "blacklist_geos",
        ] {
            sqlx::query(&format!(
                "DELETE FROM {family_table} WHERE user_id = $1"
            ))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM offers WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }

        tx.commit().await?;
        Ok(())
    }
}
