//! Page-level fields: handle rules, text limits and the saved snapshot.

use serde::Serialize;

use crate::error::CoreError;
use crate::page_grid::PageLayoutSnapshot;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Minimum length of a page handle.
pub const HANDLE_MIN_LEN: usize = 3;

/// Maximum length of a page handle.
pub const HANDLE_MAX_LEN: usize = 30;

/// Maximum length of a page title (characters).
pub const MAX_TITLE_LEN: usize = 120;

/// Maximum length of a page description (characters).
pub const MAX_DESCRIPTION_LEN: usize = 500;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a public page handle.
///
/// Handles are 3-30 characters of lowercase ASCII letters, digits, `-` and
/// `_`, starting with a letter or digit.
pub fn validate_handle(handle: &str) -> Result<(), CoreError> {
    let len = handle.chars().count();
    if !(HANDLE_MIN_LEN..=HANDLE_MAX_LEN).contains(&len) {
        return Err(CoreError::Validation(format!(
            "Handle must be between {HANDLE_MIN_LEN} and {HANDLE_MAX_LEN} characters"
        )));
    }
    let valid_chars = handle
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    let valid_start = handle
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !valid_chars || !valid_start {
        return Err(CoreError::Validation(format!(
            "Invalid handle '{handle}'. Use lowercase letters, digits, '-' or '_', starting with a letter or digit"
        )));
    }
    Ok(())
}

/// Validate title and description lengths.
pub fn validate_page_text(title: &str, description: &str) -> Result<(), CoreError> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(CoreError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything about a page that is saved as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageSnapshot {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    /// `None` is an empty page.
    pub layout: Option<PageLayoutSnapshot>,
}

/// Partial update of a [`PageSnapshot`]. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSnapshotPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<Option<String>>,
    pub layout: Option<Option<PageLayoutSnapshot>>,
}

impl PageSnapshot {
    /// Copy of this snapshot with `patch` applied.
    pub fn merged(&self, patch: PageSnapshotPatch) -> Self {
        Self {
            title: patch.title.unwrap_or_else(|| self.title.clone()),
            description: patch.description.unwrap_or_else(|| self.description.clone()),
            image_url: patch.image_url.unwrap_or_else(|| self.image_url.clone()),
            layout: patch.layout.unwrap_or_else(|| self.layout.clone()),
        }
    }
}

/// Payload handed to the save collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavePageRequest {
    pub page_id: DbId,
    #[serde(flatten)]
    pub snapshot: PageSnapshot,
}
