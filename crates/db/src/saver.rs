//! [`PageSaver`] backed by the `pages` table.

use async_trait::async_trait;
use brickpage_core::autosave::{PageSaver, SaveError, GENERIC_SAVE_ERROR_MESSAGE};
use brickpage_core::page::{validate_page_text, SavePageRequest};

use crate::models::page::SavePageSnapshot;
use crate::repositories::PageRepo;
use crate::DbPool;

/// Writes auto-saved drafts straight to Postgres.
#[derive(Clone)]
pub struct PgPageSaver {
    pool: DbPool,
}

impl PgPageSaver {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageSaver for PgPageSaver {
    async fn save(&self, request: SavePageRequest) -> Result<(), SaveError> {
        validate_page_text(&request.snapshot.title, &request.snapshot.description)?;

        let dto = SavePageSnapshot::try_from(&request.snapshot).map_err(|err| {
            tracing::error!(page_id = request.page_id, error = %err, "Failed to encode page layout");
            SaveError::new(GENERIC_SAVE_ERROR_MESSAGE)
        })?;
        match PageRepo::save_snapshot(&self.pool, request.page_id, &dto).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(SaveError::new("Page no longer exists.")),
            Err(err) => {
                tracing::error!(page_id = request.page_id, error = %err, "Failed to save page snapshot");
                Err(SaveError::new(GENERIC_SAVE_ERROR_MESSAGE))
            }
        }
    }
}
