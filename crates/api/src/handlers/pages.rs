//! Handlers for the `/pages` resource and public page reads.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use brickpage_core::brick::Brick;
use brickpage_core::error::CoreError;
use brickpage_core::page::{validate_handle, validate_page_text, PageSnapshot};
use brickpage_core::page_grid::{parse_page_layout_snapshot, serialize_page_layout};
use brickpage_core::types::{DbId, Timestamp};
use brickpage_db::models::page::{CreatePage, Page, SavePageSnapshot};
use brickpage_db::repositories::PageRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Owner view of a page with its layout rehydrated into bricks.
#[derive(Debug, Serialize)]
pub struct PageView {
    pub id: DbId,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub bricks: Vec<Brick>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Page> for PageView {
    fn from(page: Page) -> Self {
        let bricks = page.bricks();
        Self {
            id: page.id,
            handle: page.handle,
            title: page.title,
            description: page.description,
            image_url: page.image_url,
            bricks,
            created_at: page.created_at,
            updated_at: page.updated_at,
        }
    }
}

/// What anyone may see of a page.
#[derive(Debug, Serialize)]
pub struct PublicPageView {
    pub handle: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub bricks: Vec<Brick>,
}

impl From<Page> for PublicPageView {
    fn from(page: Page) -> Self {
        let bricks = page.bricks();
        Self {
            handle: page.handle,
            title: page.title,
            description: page.description,
            image_url: page.image_url,
            bricks,
        }
    }
}

/// Body of `PUT /pages/{id}`: the full saved state of the page.
#[derive(Debug, Deserialize)]
pub struct SavePageBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub layout: Option<serde_json::Value>,
}

impl SavePageBody {
    /// Validated snapshot. The layout goes through the same parse and
    /// serialize steps as a reload, so only well-formed persistable bricks
    /// are stored.
    fn into_snapshot(self) -> Result<PageSnapshot, CoreError> {
        validate_page_text(&self.title, &self.description)?;
        let layout = self
            .layout
            .as_ref()
            .map(parse_page_layout_snapshot)
            .and_then(|bricks| serialize_page_layout(&bricks));
        let image_url = self
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        Ok(PageSnapshot {
            title: self.title,
            description: self.description,
            image_url,
            layout,
        })
    }
}

/// Load a page the caller owns.
async fn find_owned_page(state: &AppState, id: DbId, user: AuthUser) -> AppResult<Page> {
    let page = PageRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Page", id }))?;
    if page.user_id != user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this page".into(),
        )));
    }
    Ok(page)
}

/// POST /api/v1/pages
pub async fn create_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(mut input): Json<CreatePage>,
) -> AppResult<(StatusCode, Json<DataResponse<PageView>>)> {
    input.handle = input.handle.trim().to_string();
    validate_handle(&input.handle)?;
    validate_page_text(
        input.title.as_deref().unwrap_or_default(),
        input.description.as_deref().unwrap_or_default(),
    )?;

    let page = PageRepo::create(&state.pool, auth.user_id, &input).await?;
    tracing::info!(page_id = page.id, user_id = auth.user_id, handle = %page.handle, "Page created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: page.into() }),
    ))
}

/// GET /api/v1/pages
pub async fn list_pages(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<PageView>>>> {
    let pages = PageRepo::list_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse {
        data: pages.into_iter().map(PageView::from).collect(),
    }))
}

/// GET /api/v1/pages/{id}
pub async fn get_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PageView>>> {
    let page = find_owned_page(&state, id, auth).await?;
    Ok(Json(DataResponse { data: page.into() }))
}

/// PUT /api/v1/pages/{id}
///
/// Replaces title, description, image and layout in one write.
pub async fn save_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<SavePageBody>,
) -> AppResult<Json<DataResponse<PageView>>> {
    let snapshot = body.into_snapshot()?;
    find_owned_page(&state, id, auth).await?;

    let dto = SavePageSnapshot::try_from(&snapshot)
        .map_err(|e| AppError::InternalError(format!("Failed to encode page layout: {e}")))?;
    let page = PageRepo::save_snapshot(&state.pool, id, &dto)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Page", id }))?;
    tracing::debug!(
        page_id = id,
        bricks = snapshot.layout.as_ref().map_or(0, |l| l.bricks.len()),
        "Page saved",
    );
    Ok(Json(DataResponse { data: page.into() }))
}

/// DELETE /api/v1/pages/{id}
pub async fn delete_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    find_owned_page(&state, id, auth).await?;
    if PageRepo::delete(&state.pool, id).await? {
        tracing::info!(page_id = id, user_id = auth.user_id, "Page deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound { entity: "Page", id }))
    }
}

/// GET /api/v1/public/pages/{handle}
pub async fn get_public_page(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> AppResult<Json<DataResponse<PublicPageView>>> {
    let not_found = || AppError::NotFound(format!("No page with handle '{handle}'"));
    if validate_handle(&handle).is_err() {
        return Err(not_found());
    }
    let page = PageRepo::find_by_handle(&state.pool, &handle)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(DataResponse { data: page.into() }))
}
