//! Domain models for the context version store.
//!
//! Canonical definitions for the core entities:
//! - `Version`: immutable snapshot of the context blob plus metadata
//! - `VersionId`: content-derived identifier of a version record
//! - `HistoryPage` / `VersionSummary`: paginated history rows
//! - `Snapshot`: point-in-time content fetched by identifier

pub mod error;
pub mod version;

// Re-export main types and errors
pub use error::{ContextError, Result};
pub use version::{HistoryPage, Snapshot, Version, VersionId, VersionSummary};
