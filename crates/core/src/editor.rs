//! Editing session of one page grid.
//!
//! [`PageGridEditor`] serializes every change through [`reduce`], runs media
//! uploads and link lookups through injected collaborators, and feeds the
//! persistable layout to the page's [`AutoSaveController`] whenever the
//! reducer asks for it.
//!
//! Placeholders are added before the async work starts and removed again if
//! that work fails. Link lookups are tracked per brick with a generation
//! counter; only the latest lookup for a brick may touch it.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::autosave::AutoSaveController;
use crate::brick::{Brick, BrickType, LinkBrickData, MapBrickData};
use crate::error::CoreError;
use crate::grid::{Breakpoint, GridConfig, LayoutItem, Responsive};
use crate::link::{normalize_link_url, LinkMetadataFetcher};
use crate::media::{validate_media_file, MediaFile, MediaUploadRequest, MediaUploader};
use crate::page::PageSnapshotPatch;
use crate::page_grid::{build_layouts_from_bricks, serialize_page_layout};
use crate::reducer::{reduce, PageGridAction, PageGridState};
use crate::types::{BrickId, DbId};

/// Who is editing which page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorSession {
    pub page_id: DbId,
    pub user_id: DbId,
}

/// Services an editor talks to.
#[derive(Clone)]
pub struct EditorCollaborators {
    pub uploader: Arc<dyn MediaUploader>,
    pub link_fetcher: Arc<dyn LinkMetadataFetcher>,
    pub autosave: Arc<AutoSaveController>,
}

pub struct PageGridEditor {
    session: EditorSession,
    config: GridConfig,
    collaborators: EditorCollaborators,
    inner: Mutex<EditorState>,
}

struct EditorState {
    grid: PageGridState,
    link_generations: HashMap<BrickId, u64>,
}

impl PageGridEditor {
    /// Start editing `bricks`, usually the output of
    /// [`crate::page_grid::parse_page_layout_snapshot`].
    pub fn new(
        session: EditorSession,
        bricks: Vec<Brick>,
        config: GridConfig,
        collaborators: EditorCollaborators,
    ) -> Self {
        Self {
            session,
            config,
            collaborators,
            inner: Mutex::new(EditorState {
                grid: PageGridState::new(bricks),
                link_generations: HashMap::new(),
            }),
        }
    }

    pub fn session(&self) -> EditorSession {
        self.session
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub async fn bricks(&self) -> Vec<Brick> {
        self.inner.lock().await.grid.bricks.clone()
    }

    /// Grid layouts of both breakpoints for the current bricks.
    pub async fn layouts(&self) -> Responsive<Vec<LayoutItem>> {
        build_layouts_from_bricks(&self.inner.lock().await.grid.bricks, &self.config)
    }

    /// Apply `action` and hand the layout to auto-save when the reducer asks
    /// for it. Returns whether the state changed.
    ///
    /// The editor lock is held until auto-save has the layout, so drafts
    /// reach it in the same order the actions were applied. Lock order is
    /// editor, then auto-save.
    pub async fn dispatch(&self, action: PageGridAction) -> bool {
        let mut inner = self.inner.lock().await;
        let next = match reduce(&inner.grid, action, &self.config, chrono::Utc::now()) {
            Cow::Borrowed(_) => None,
            Cow::Owned(next) => Some(next),
        };
        let changed = next.is_some();
        if let Some(next) = next {
            inner.grid = next;
        }

        if inner.grid.should_persist_draft {
            inner.grid.should_persist_draft = false;
            let layout = serialize_page_layout(&inner.grid.bricks);
            self.collaborators
                .autosave
                .update_draft(PageSnapshotPatch {
                    layout: Some(layout),
                    ..PageSnapshotPatch::default()
                })
                .await;
        }
        changed
    }

    // -- media --

    /// Upload `file` into a new image or video brick.
    ///
    /// Invalid files are rejected before anything is added or uploaded. A
    /// failed upload removes the placeholder and flags auto-save.
    pub async fn add_media(&self, file: MediaFile) -> Result<BrickId, CoreError> {
        let kind = validate_media_file(&file)?;
        let id = new_brick_id();
        self.dispatch(PageGridAction::AddMediaPlaceholder {
            id: id.clone(),
            kind,
        })
        .await;

        let request = MediaUploadRequest {
            page_id: self.session.page_id,
            user_id: self.session.user_id,
            object_id: id.clone(),
            file,
        };
        match self.collaborators.uploader.upload(request).await {
            Ok(uploaded) => {
                self.dispatch(PageGridAction::CompleteMediaUpload {
                    id: id.clone(),
                    url: uploaded.public_url,
                })
                .await;
                Ok(id)
            }
            Err(err) => {
                tracing::warn!(page_id = self.session.page_id, brick_id = %id, error = %err, "Media upload failed");
                self.dispatch(PageGridAction::RemoveBrick { id }).await;
                self.collaborators.autosave.mark_error();
                Err(err)
            }
        }
    }

    pub async fn update_media_link(&self, id: &str, link_url: Option<String>) -> bool {
        self.dispatch(PageGridAction::UpdateMediaLink {
            id: id.to_string(),
            link_url,
        })
        .await
    }

    // -- text --

    pub async fn add_text(&self) -> BrickId {
        let id = new_brick_id();
        self.dispatch(PageGridAction::AddTextPlaceholder { id: id.clone() })
            .await;
        id
    }

    pub async fn update_text(
        &self,
        id: &str,
        text: String,
        is_editing: bool,
        row_span: Option<(Breakpoint, u32)>,
    ) -> bool {
        self.dispatch(PageGridAction::UpdateText {
            id: id.to_string(),
            text,
            is_editing,
            row_span,
            persist: true,
        })
        .await
    }

    /// Record a measured text height without scheduling a save.
    pub async fn update_text_row_span(&self, id: &str, breakpoint: Breakpoint, row_span: u32) -> bool {
        self.dispatch(PageGridAction::UpdateTextRowSpanLocal {
            id: id.to_string(),
            breakpoint,
            row_span,
        })
        .await
    }

    // -- map --

    pub async fn add_map(&self, data: Option<MapBrickData>) -> BrickId {
        let id = new_brick_id();
        self.dispatch(PageGridAction::AddMapPlaceholder {
            id: id.clone(),
            data,
        })
        .await;
        id
    }

    pub async fn update_map(&self, id: &str, data: MapBrickData) -> bool {
        self.dispatch(PageGridAction::UpdateMap {
            id: id.to_string(),
            data,
        })
        .await
    }

    // -- links --

    /// Add a link brick for `input` and decorate it with fetched metadata.
    ///
    /// If the lookup fails the placeholder is removed and the error returned.
    pub async fn add_link(&self, input: &str) -> Result<BrickId, CoreError> {
        let url = normalize_link_url(input)?;
        let id = new_brick_id();
        self.dispatch(PageGridAction::AddLinkPlaceholder {
            id: id.clone(),
            url: url.clone(),
        })
        .await;

        let generation = self.next_link_generation(&id).await;
        match self.collaborators.link_fetcher.fetch(&url).await {
            Ok(metadata) => {
                if self.is_current_link(&id, generation).await {
                    self.dispatch(PageGridAction::UpdateLink {
                        id: id.clone(),
                        data: metadata.into_brick_data(url),
                    })
                    .await;
                }
                Ok(id)
            }
            Err(err) => {
                if self.is_current_link(&id, generation).await {
                    tracing::warn!(brick_id = %id, error = %err, "Link metadata fetch failed");
                    self.remove_brick(&id).await;
                }
                Err(err)
            }
        }
    }

    /// Point an existing link brick at `input` and refresh its metadata.
    ///
    /// The new URL is applied at once. Metadata from a lookup that has since
    /// been superseded is ignored; a failed lookup keeps the bare URL.
    pub async fn update_link_url(&self, id: &str, input: &str) -> Result<(), CoreError> {
        let url = normalize_link_url(input)?;
        match self.brick_type(id).await {
            None => return Err(CoreError::BrickNotFound(id.to_string())),
            Some(BrickType::Link) => {}
            Some(other) => {
                return Err(CoreError::Validation(format!(
                    "Brick '{id}' is a {} brick, not a link",
                    other.as_str()
                )))
            }
        }
        self.dispatch(PageGridAction::UpdateLink {
            id: id.to_string(),
            data: LinkBrickData {
                url: url.clone(),
                ..LinkBrickData::default()
            },
        })
        .await;

        let generation = self.next_link_generation(id).await;
        match self.collaborators.link_fetcher.fetch(&url).await {
            Ok(metadata) => {
                if self.is_current_link(id, generation).await {
                    self.dispatch(PageGridAction::UpdateLink {
                        id: id.to_string(),
                        data: metadata.into_brick_data(url),
                    })
                    .await;
                } else {
                    tracing::debug!(brick_id = %id, generation, "Dropping stale link metadata");
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(brick_id = %id, error = %err, "Link metadata fetch failed");
                Ok(())
            }
        }
    }

    // -- layout --

    pub async fn apply_layout(&self, layout: Vec<LayoutItem>, breakpoint: Breakpoint) -> bool {
        self.dispatch(PageGridAction::ApplyLayout { layout, breakpoint })
            .await
    }

    pub async fn remove_brick(&self, id: &str) -> bool {
        self.inner.lock().await.link_generations.remove(id);
        self.dispatch(PageGridAction::RemoveBrick { id: id.to_string() })
            .await
    }

    async fn brick_type(&self, id: &str) -> Option<BrickType> {
        self.inner.lock().await.grid.brick(id).map(Brick::brick_type)
    }

    async fn next_link_generation(&self, id: &str) -> u64 {
        let mut inner = self.inner.lock().await;
        let generation = inner.link_generations.entry(id.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    async fn is_current_link(&self, id: &str, generation: u64) -> bool {
        self.inner.lock().await.link_generations.get(id) == Some(&generation)
    }
}

fn new_brick_id() -> BrickId {
    uuid::Uuid::new_v4().to_string()
}
