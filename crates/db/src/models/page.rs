//! Page models and DTOs.

use brickpage_core::brick::Brick;
use brickpage_core::page::PageSnapshot;
use brickpage_core::page_grid::{
    parse_page_layout_snapshot, serialize_page_layout, PageLayoutSnapshot,
};
use brickpage_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `pages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Page {
    pub id: DbId,
    pub user_id: DbId,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    /// Raw persisted layout. Untrusted; read it through [`Page::bricks`].
    pub layout: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Page {
    /// Rehydrated bricks of the stored layout. Malformed entries are dropped.
    pub fn bricks(&self) -> Vec<Brick> {
        self.layout
            .as_ref()
            .map(parse_page_layout_snapshot)
            .unwrap_or_default()
    }

    /// The page as the editor's initial auto-save snapshot.
    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            layout: serialize_page_layout(&self.bricks()),
        }
    }
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

/// DTO for creating a new page.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePage {
    pub handle: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Full replacement of a page's saved fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SavePageSnapshot {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub layout: Option<serde_json::Value>,
}

/// Fails only when the layout cannot be turned into JSON; the row is never
/// written with a missing layout in that case.
impl TryFrom<&PageSnapshot> for SavePageSnapshot {
    type Error = serde_json::Error;

    fn try_from(snapshot: &PageSnapshot) -> Result<Self, Self::Error> {
        Ok(Self {
            title: snapshot.title.clone(),
            description: snapshot.description.clone(),
            image_url: snapshot.image_url.clone(),
            layout: snapshot
                .layout
                .as_ref()
                .map(PageLayoutSnapshot::to_json)
                .transpose()?,
        })
    }
}
