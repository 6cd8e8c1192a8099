//! Repository for the `pages` table.

use sqlx::PgPool;
use brickpage_core::types::DbId;

use crate::models::page::{CreatePage, Page, SavePageSnapshot};

/// Column list for `pages` queries.
const COLUMNS: &str = "\
    id, user_id, handle, title, description, image_url, layout, \
    created_at, updated_at";

/// Provides data access for pages.
pub struct PageRepo;

impl PageRepo {
    /// Create a page owned by `user_id`.
    ///
    /// Fails with a unique violation on `uq_pages_handle` when the handle is
    /// taken.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        dto: &CreatePage,
    ) -> Result<Page, sqlx::Error> {
        let query = format!(
            "INSERT INTO pages (user_id, handle, title, description) \
             VALUES ($1, $2, COALESCE($3, ''), COALESCE($4, '')) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(user_id)
            .bind(&dto.handle)
            .bind(&dto.title)
            .bind(&dto.description)
            .fetch_one(pool)
            .await
    }

    /// Find a page by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1");
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a page by its public handle.
    pub async fn find_by_handle(
        pool: &PgPool,
        handle: &str,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE handle = $1");
        sqlx::query_as::<_, Page>(&query)
            .bind(handle)
            .fetch_optional(pool)
            .await
    }

    /// List a user's pages, most recently edited first.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Page>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages WHERE user_id = $1 ORDER BY updated_at DESC, id DESC"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Overwrite title, description, image and layout in one statement.
    ///
    /// Returns `None` if the page does not exist.
    pub async fn save_snapshot(
        pool: &PgPool,
        id: DbId,
        dto: &SavePageSnapshot,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!(
            "UPDATE pages SET \
                 title = $2, \
                 description = $3, \
                 image_url = $4, \
                 layout = $5 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .bind(&dto.title)
            .bind(&dto.description)
            .bind(&dto.image_url)
            .bind(&dto.layout)
            .fetch_optional(pool)
            .await
    }

    /// Delete a page by ID.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
