//! actx core library
//!
//! Durable, versioned scratch-memory for autonomous agents: a branch-capable,
//! content-addressed context store with layered configuration and
//! token-budget telemetry. Re-exports the core components for programmatic
//! access; the `actx` CLI and the `actxd` tool server are thin front ends
//! over this crate.

pub mod branch;
pub mod config;
pub mod domain;
pub mod oplog;
pub mod store;
pub mod telemetry;
pub mod token;

pub use branch::BranchManager;
pub use config::{ConfigOverlay, ConfigResolver, EffectiveConfig, TokenApproach};
pub use domain::{ContextError, HistoryPage, Result, Snapshot, Version, VersionId, VersionSummary};
pub use oplog::BranchLog;
pub use store::ContextStore;
pub use telemetry::init_tracing;
pub use token::{TokenMeter, TokenMetrics};

/// actx version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
