pub mod health;
pub mod link_preview;
pub mod pages;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /pages                         list, create (requires auth)
/// /pages/{id}                    get, save (PUT), delete
/// /pages/{id}/media              upload (POST, multipart)
/// /public/pages/{handle}         public read
/// /link-preview?url=             link metadata (requires auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/pages", pages::router())
        .nest("/public/pages", pages::public_router())
        .nest("/link-preview", link_preview::router())
}
