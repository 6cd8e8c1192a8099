use std::sync::Arc;

use brickpage_core::link::LinkMetadataFetcher;
use brickpage_core::media::MediaUploader;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: brickpage_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Where uploaded media goes.
    pub media: Arc<dyn MediaUploader>,
    /// Resolves link preview metadata.
    pub link_fetcher: Arc<dyn LinkMetadataFetcher>,
}
