//! Snapshot cache: externally-owned key/value storage with TTL.
//!
//! Snapshots are derived data; the cache may be wiped at any time without
//! semantic loss. Writes are delete-then-set (never merge) so removed
//! policies cannot linger, and every write carries a TTL so missed
//! invalidations self-heal.

mod in_memory;
#[cfg(feature = "redis")]
mod redis;

use core::fmt;
use std::time::Duration;

use thiserror::Error;

use talentgrid_authz::{PermissionSnapshot, ScopeRef};
use talentgrid_core::{TenantId, UserId};

pub use in_memory::InMemorySnapshotCache;
#[cfg(feature = "redis")]
pub use redis::RedisSnapshotCache;

/// Composite key of one snapshot: (tenant, user, scope).
///
/// Rendered keys are always fully structured; the null tenant-root scope id
/// uses a literal `-` placeholder rather than omitting the segment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub scope: ScopeRef,
}

const KEY_PREFIX: &str = "authz:snapshot";

impl SnapshotKey {
    pub fn new(tenant_id: TenantId, user_id: UserId, scope: ScopeRef) -> Self {
        Self {
            tenant_id,
            user_id,
            scope,
        }
    }

    pub fn for_snapshot(snapshot: &PermissionSnapshot) -> Self {
        Self::new(snapshot.tenant_id, snapshot.user_id, snapshot.scope)
    }

    pub fn render(&self) -> String {
        format!(
            "{KEY_PREFIX}:{}:{}:{}",
            self.tenant_id,
            self.user_id,
            self.scope.key_segment()
        )
    }

    /// Prefix matching every snapshot key of one user.
    pub fn user_prefix(tenant_id: TenantId, user_id: UserId) -> String {
        format!("{KEY_PREFIX}:{tenant_id}:{user_id}:")
    }

    /// Prefix matching every snapshot key of one tenant.
    pub fn tenant_prefix(tenant_id: TenantId) -> String {
        format!("{KEY_PREFIX}:{tenant_id}:")
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Snapshot cache operation error.
///
/// Cache unavailability is never fatal to a check: the engine degrades to
/// rebuilding from the store, which remains authoritative.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend could not be reached; retryable.
    #[error("snapshot cache unavailable: {0}")]
    Unavailable(String),

    /// A cached entry could not be decoded back into a snapshot.
    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
}

/// TTL'd key/value storage for permission snapshots.
#[async_trait::async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Look up a snapshot. A miss is `Ok(None)`, not an error.
    async fn get(&self, key: &SnapshotKey) -> Result<Option<PermissionSnapshot>, CacheError>;

    /// Store a snapshot, replacing any previous entry wholesale.
    async fn put(&self, snapshot: &PermissionSnapshot, ttl: Duration) -> Result<(), CacheError>;

    /// Delete every snapshot for one user.
    async fn invalidate_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<(), CacheError>;

    /// Delete every snapshot tenant-wide.
    async fn invalidate_tenant(&self, tenant_id: TenantId) -> Result<(), CacheError>;
}

#[async_trait::async_trait]
impl<C> SnapshotCache for std::sync::Arc<C>
where
    C: SnapshotCache + ?Sized,
{
    async fn get(&self, key: &SnapshotKey) -> Result<Option<PermissionSnapshot>, CacheError> {
        (**self).get(key).await
    }

    async fn put(&self, snapshot: &PermissionSnapshot, ttl: Duration) -> Result<(), CacheError> {
        (**self).put(snapshot, ttl).await
    }

    async fn invalidate_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<(), CacheError> {
        (**self).invalidate_user(tenant_id, user_id).await
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> Result<(), CacheError> {
        (**self).invalidate_tenant(tenant_id).await
    }
}
