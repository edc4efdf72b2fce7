//! HTTP response types and error mapping
//!
//! Error bodies are always `{"error": "..."}`. Only validation messages are
//! passed through to clients; everything else is collapsed into a fixed
//! summary and the detail goes to the log.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::errors::AppError;
use crate::models::{ImageLocations, Palette, Resolution};

pub const UPSTREAM_ERROR_MESSAGE: &str = "Failed to fetch wallpaper";
pub const ANALYSIS_ERROR_MESSAGE: &str = "Failed to analyze wallpaper colors";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Palette plus wallpaper metadata, as served by `/api/colors`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorTheme {
    pub startdate: String,
    pub fullstartdate: String,
    pub enddate: String,
    pub images: ImageLocations,
    pub colors: Palette,
    pub title: String,
    pub copyright: String,
    pub copyright_link: String,
    pub cached_at: String,
    pub from_cache: bool,
}

impl ColorTheme {
    pub fn from_resolution(resolution: Resolution, now: DateTime<Utc>) -> Self {
        let Resolution {
            palette,
            image_urls,
            metadata,
            from_cache,
        } = resolution;

        Self {
            startdate: metadata.start_date,
            fullstartdate: metadata.full_start_date,
            enddate: metadata.end_date,
            images: image_urls,
            colors: palette,
            title: metadata.title,
            copyright: metadata.copyright,
            copyright_link: metadata.copyright_link,
            cached_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            from_cache,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: String,
}

impl HealthResponse {
    pub fn ok(now: DateTime<Utc>) -> Self {
        Self {
            status: "ok".to_string(),
            time: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Map an application error to a sanitized HTTP response
pub fn handle_error(error: AppError) -> Response {
    let (status, message) = match &error {
        AppError::Validation { message } => {
            warn!("Rejected request: {}", message);
            (StatusCode::BAD_REQUEST, message.clone())
        }
        AppError::Upstream(e) => {
            error!("Wallpaper fetch failed: {}", e);
            (StatusCode::BAD_GATEWAY, UPSTREAM_ERROR_MESSAGE.to_string())
        }
        AppError::Analysis(e) => {
            error!("Palette analysis failed: {}", e);
            (StatusCode::BAD_GATEWAY, ANALYSIS_ERROR_MESSAGE.to_string())
        }
        AppError::Configuration { .. } | AppError::Internal { .. } => {
            error!("Request failed: {}", error);
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE.to_string())
        }
    };

    error_response(status, message)
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}
