//! dailyhues: AI-derived color palettes for the daily Bing wallpaper
//!
//! The interesting part is the [`cache`]: a request-level store keyed by
//! locale and day, layered over a content-addressed analysis store, so a
//! wallpaper shared across markets is only analyzed once.

pub mod analyzer;
pub mod assets;
pub mod cache;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod sources;
pub mod web;

pub use errors::{AppError, AppResult};
