//! Two-level, content-addressed palette cache
//!
//! - `RequestStore`: logical key (locale + days ago) -> metadata and the
//!   fingerprint of the image it served, with an expiry time
//! - `AnalysisStore`: fingerprint -> palette, shared across logical keys
//! - `KeyedLockRegistry`: per-fingerprint exclusion for the analysis step
//!
//! Both stores keep an in-memory mirror that is loaded in bulk at startup
//! and written through to flat JSON files.

pub mod analysis_store;
pub mod hasher;
pub mod keyed_lock;
pub mod record_dir;
pub mod request_store;

pub use analysis_store::AnalysisStore;
pub use hasher::fingerprint;
pub use keyed_lock::{KeyedLock, KeyedLockRegistry};
pub use record_dir::RecordDir;
pub use request_store::RequestStore;
