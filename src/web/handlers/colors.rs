//! `/api/colors` handler

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::debug;

use crate::web::{
    AppState,
    extractors::ColorsRequest,
    responses::{ColorTheme, handle_error},
};

/// Palette and metadata for the requested wallpaper.
///
/// Resolution runs detached from the connection, so a client that hangs
/// up mid-analysis does not abort work other requests may be waiting on.
pub async fn get_colors(State(state): State<AppState>, ColorsRequest(key): ColorsRequest) -> Response {
    debug!(key = %key, "Resolving colors");

    match state.orchestrator.resolve_detached(key).await {
        Ok(resolution) => Json(ColorTheme::from_resolution(resolution, Utc::now())).into_response(),
        Err(e) => handle_error(e),
    }
}
