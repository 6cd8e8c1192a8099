//! Handler for page media uploads.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use brickpage_core::error::CoreError;
use brickpage_core::media::{validate_media_file, MediaFile, MediaKind, MediaUploadRequest};
use brickpage_core::types::DbId;
use brickpage_db::repositories::PageRepo;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Result of a media upload.
#[derive(Debug, Serialize)]
pub struct MediaUploadResponse {
    pub kind: MediaKind,
    pub url: String,
    pub path: String,
    pub object_id: String,
}

/// POST /api/v1/pages/{id}/media
///
/// Multipart fields: `file` (required) and `object_id` (optional; the brick
/// id or `cover`). Without an `object_id` a fresh one is generated.
pub async fn upload_media(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(page_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<MediaUploadResponse>>)> {
    let mut file: Option<MediaFile> = None;
    let mut object_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let mime_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some(MediaFile {
                    name: file_name,
                    mime_type,
                    data: data.to_vec(),
                });
            }
            "object_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let text = text.trim();
                if !text.is_empty() {
                    object_id = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    let kind = validate_media_file(&file)?;
    let object_id = object_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    if !object_id.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::BadRequest("Invalid media object id".into()));
    }

    let page = PageRepo::find_by_id(&state.pool, page_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Page",
            id: page_id,
        }))?;
    if page.user_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this page".into(),
        )));
    }

    let uploaded = state
        .media
        .upload(MediaUploadRequest {
            page_id,
            user_id: auth.user_id,
            object_id: object_id.clone(),
            file,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: MediaUploadResponse {
                kind,
                url: uploaded.public_url,
                path: uploaded.path,
                object_id,
            },
        }),
    ))
}
