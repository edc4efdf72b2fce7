//! Web handlers module
//!
//! Handlers stay thin: validation happens in extractors and all cache
//! logic lives in the lookup orchestrator.

pub mod colors;
pub mod health;
pub mod index;
