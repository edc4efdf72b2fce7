//! AI palette analysis
//!
//! `PaletteAnalyzer` is the seam the lookup orchestrator calls on a true
//! cache miss. `OpenRouterAnalyzer` is the production implementation.

use async_trait::async_trait;

use crate::errors::AnalysisError;
use crate::models::{AnalysisHints, Palette};

pub mod image_prep;
pub mod openrouter;
pub mod prompt;

pub use openrouter::{OpenRouterAnalyzer, parse_palette};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaletteAnalyzer: Send + Sync {
    /// Derive a palette from raw image bytes
    async fn analyze(&self, bytes: &[u8], hints: &AnalysisHints) -> Result<Palette, AnalysisError>;
}
