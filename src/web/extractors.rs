//! Request extractors and validation

use axum::{
    extract::{FromRequestParts, Query},
    http::{StatusCode, request::Parts},
    response::Response,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::AppState;
use super::responses::{error_response, handle_error};
use crate::config::WebConfig;
use crate::errors::{AppError, AppResult};
use crate::models::LogicalKey;

/// Raw `/api/colors` query string. Empty values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColorsQuery {
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default, rename = "daysAgo")]
    pub days_ago: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ColorsQuery {
    /// Validate against the web config, resolving `date` relative to `today`
    pub fn validate(&self, web: &WebConfig, today: NaiveDate) -> AppResult<LogicalKey> {
        let locale = match present(&self.locale) {
            None => web.default_locale.clone(),
            Some(locale) if web.is_allowed_locale(locale) => locale.to_string(),
            Some(_) => {
                return Err(AppError::validation(format!(
                    "Invalid locale. Supported locales: {}",
                    web.allowed_locales.join(", ")
                )));
            }
        };

        let days_ago = match (present(&self.days_ago), present(&self.date)) {
            (Some(_), Some(_)) => {
                return Err(AppError::validation("Use either date or daysAgo, not both"));
            }
            (Some(days_ago), None) => parse_days_ago(days_ago, web.max_days_back)?,
            (None, Some(date)) => days_ago_for_date(date, today, web.max_days_back)?,
            (None, None) => 0,
        };

        Ok(LogicalKey::new(locale, days_ago))
    }
}

fn too_old(max_days_back: u32, field: &str) -> AppError {
    AppError::validation(format!(
        "{field} too large. Bing only keeps wallpapers for the last {max_days_back} days"
    ))
}

fn parse_days_ago(value: &str, max_days_back: u32) -> AppResult<u32> {
    let days_ago: i64 = value
        .parse()
        .map_err(|_| AppError::validation("Invalid daysAgo parameter. Must be an integer"))?;

    if days_ago < 0 {
        return Err(AppError::validation("daysAgo cannot be negative"));
    }
    if days_ago > i64::from(max_days_back) {
        return Err(too_old(max_days_back, "daysAgo"));
    }
    Ok(days_ago as u32)
}

fn days_ago_for_date(value: &str, today: NaiveDate, max_days_back: u32) -> AppResult<u32> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::validation("Invalid date parameter. Expected YYYY-MM-DD"))?;

    let days_ago = (today - date).num_days();
    if days_ago < 0 {
        return Err(AppError::validation("date cannot be in the future"));
    }
    if days_ago > i64::from(max_days_back) {
        return Err(too_old(max_days_back, "date"));
    }
    Ok(days_ago as u32)
}

/// Validated logical key for `/api/colors`
#[derive(Debug, Clone)]
pub struct ColorsRequest(pub LogicalKey);

impl FromRequestParts<AppState> for ColorsRequest {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Query(query): Query<ColorsQuery> = Query::from_request_parts(parts, state)
            .await
            .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid query parameters"))?;

        query
            .validate(&state.config.web, Utc::now().date_naive())
            .map(ColorsRequest)
            .map_err(handle_error)
    }
}
