mod files;
mod status;

pub use files::get_by_filename;
pub use status::status;

use crate::index::LocationIndex;
use crate::storage::ContentStreamer;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<LocationIndex>,
    pub streamer: Arc<ContentStreamer>,
    /// Use 206 for responses that carry a `Content-Range`.
    pub partial_content: bool,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/by-filename/*name", get(get_by_filename))
        .route("/webhdfs/v1/by-filename/*name", get(get_by_filename))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
