//! Index page handler
//!
//! Serves the embedded landing page.

use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse},
};

use crate::assets::StaticAssets;

const INDEX_PAGE: &str = "static/index.html";

/// Serve the index page from embedded static assets
pub async fn index() -> impl IntoResponse {
    match StaticAssets::get_asset(INDEX_PAGE) {
        Some(file) => (
            [(header::CONTENT_TYPE, StaticAssets::get_content_type(INDEX_PAGE))],
            file.data.into_owned(),
        )
            .into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>500 Internal Server Error</h1><p>Landing page not found</p>".to_string()),
        )
            .into_response(),
    }
}
