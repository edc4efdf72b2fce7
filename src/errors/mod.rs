//! Centralized error handling for dailyhues
//!
//! # Error Categories
//!
//! - **Upstream Errors**: wallpaper feed unreachable or without a usable image
//! - **Analysis Errors**: AI call failures and unparseable palettes
//! - **Store Errors**: durable cache writes and bulk loads
//! - **Validation Errors**: rejected request parameters
//!
//! # Usage
//!
//! ```rust
//! use dailyhues::errors::{AppError, AppResult};
//!
//! fn example_function(days_ago: u32) -> AppResult<u32> {
//!     if days_ago > 7 {
//!         return Err(AppError::validation("daysAgo too large"));
//!     }
//!     Ok(days_ago)
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for feed Results
pub type SourceResult<T> = Result<T, SourceError>;

/// Convenience type alias for durable store Results
pub type StoreResult<T> = Result<T, StoreError>;
