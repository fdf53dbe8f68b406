//! `talentgrid-infra` — storage adapters, snapshot cache, and the check API.
//!
//! This crate wires the pure authorization domain (`talentgrid-authz`) to
//! its external collaborators: the tenant-scoped assignment store (read
//! only) and the snapshot cache (TTL'd key/value). `AuthzEngine` is the
//! single entry point the rest of the application consumes.

pub mod assignment_store;
pub mod engine;
pub mod snapshot_cache;

#[cfg(test)]
mod integration_tests;

pub use assignment_store::{
    AssignmentStore, AssignmentStoreError, InMemoryAssignmentStore, PostgresAssignmentStore,
};
pub use engine::{AuthzEngine, Decision, EngineConfig, EngineError};
pub use snapshot_cache::{CacheError, InMemorySnapshotCache, SnapshotCache, SnapshotKey};

#[cfg(feature = "redis")]
pub use snapshot_cache::RedisSnapshotCache;
