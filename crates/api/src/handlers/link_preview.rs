//! Handler for link preview lookups.

use axum::extract::{Query, State};
use axum::Json;
use brickpage_core::brick::LinkBrickData;
use brickpage_core::link::normalize_link_url;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LinkPreviewQuery {
    #[serde(default)]
    pub url: String,
}

/// GET /api/v1/link-preview?url=
///
/// Returns link brick data for the normalized URL.
pub async fn get_link_preview(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<LinkPreviewQuery>,
) -> AppResult<Json<DataResponse<LinkBrickData>>> {
    let url = normalize_link_url(&query.url)?;
    let metadata = state.link_fetcher.fetch(&url).await?;
    Ok(Json(DataResponse {
        data: metadata.into_brick_data(url),
    }))
}
