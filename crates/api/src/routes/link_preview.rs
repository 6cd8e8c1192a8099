use axum::routing::get;
use axum::Router;

use crate::handlers::link_preview;
use crate::state::AppState;

/// Routes mounted at `/link-preview`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(link_preview::get_link_preview))
}
