//! Wallpaper feed collaborators
//!
//! The lookup orchestrator only sees the `WallpaperFeed` trait; `bing`
//! holds the production implementation.

use async_trait::async_trait;

use crate::errors::SourceResult;
use crate::models::{FetchedWallpaper, LogicalKey};

pub mod bing;

pub use bing::BingFeedClient;

/// Fetches current metadata and raw image bytes for a logical key
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WallpaperFeed: Send + Sync {
    async fn fetch(&self, key: &LogicalKey) -> SourceResult<FetchedWallpaper>;
}
