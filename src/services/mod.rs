//! Service layer
//!
//! `lookup` composes the caches and the collaborators into a single
//! `resolve` operation for the web layer.

pub mod lookup;

pub use lookup::LookupOrchestrator;
