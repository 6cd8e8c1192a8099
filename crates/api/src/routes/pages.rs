//! Route definitions for the `/pages` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use brickpage_core::media::MAX_MEDIA_BYTES;

use crate::handlers::{media, pages};
use crate::state::AppState;

/// Multipart overhead allowed on top of the largest accepted file. Bodies up
/// to this size reach the handler, which reports oversized files itself.
const MEDIA_BODY_LIMIT: usize = MAX_MEDIA_BYTES as usize * 4;

/// Routes mounted at `/pages`.
///
/// ```text
/// GET    /                 -> list_pages
/// POST   /                 -> create_page
/// GET    /{id}             -> get_page
/// PUT    /{id}             -> save_page
/// DELETE /{id}             -> delete_page
/// POST   /{id}/media       -> upload_media
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::list_pages).post(pages::create_page))
        .route(
            "/{id}",
            get(pages::get_page)
                .put(pages::save_page)
                .delete(pages::delete_page),
        )
        .route(
            "/{id}/media",
            post(media::upload_media).layer(DefaultBodyLimit::max(MEDIA_BODY_LIMIT)),
        )
}

/// Routes mounted at `/public/pages`.
///
/// ```text
/// GET    /{handle}         -> get_public_page
/// ```
pub fn public_router() -> Router<AppState> {
    Router::new().route("/{handle}", get(pages::get_public_page))
}
