//! Hybrid relational + document persistence for the cinelog backend.
//!
//! Entity metadata lives in SQLite; per-entity payloads live in flat JSON
//! document files keyed by the same id. This crate is the single source of
//! truth for keeping the two stores consistent.

pub mod audit;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod docstore;
pub mod logging;
pub mod merge;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;

pub use config::{load_config, ConfigError, CoreConfig, LoggingConfig};
pub use coordinator::{
    CreateOutcome, DeleteOutcome, DualWriteCoordinator, DualWriteError, Inconsistency,
    TerminalState,
};
pub use docstore::{Document, DocumentStore, StoreError, StoreResult};
pub use logging::{active_logging, default_log_level, init_logging, LoggingError};
pub use merge::{MergeReader, MergedView, Page, Viewer};
pub use model::{EntityId, ProfileId};
pub use repo::{EntityRepository, PageQuery, RepoError, RepoResult};
pub use service::{ErrorClass, ServiceError, ServiceResult};
pub use storage::{Platform, PlatformError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
