//! In-memory snapshot cache for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use talentgrid_authz::PermissionSnapshot;
use talentgrid_core::{TenantId, UserId};

use super::{CacheError, SnapshotCache, SnapshotKey};

#[derive(Debug, Clone)]
struct Entry {
    expires_at: Instant,
    snapshot: PermissionSnapshot,
}

/// In-memory TTL'd snapshot cache.
///
/// Expiry is checked lazily on read; there is no background sweeper.
#[derive(Debug, Default)]
pub struct InMemorySnapshotCache {
    inner: RwLock<HashMap<String, Entry>>,
}

impl InMemorySnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries; test helper.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .read()
            .map(|map| map.values().filter(|e| e.expires_at > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> CacheError {
        CacheError::Unavailable("lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl SnapshotCache for InMemorySnapshotCache {
    async fn get(&self, key: &SnapshotKey) -> Result<Option<PermissionSnapshot>, CacheError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map
            .get(&key.render())
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.snapshot.clone()))
    }

    async fn put(&self, snapshot: &PermissionSnapshot, ttl: Duration) -> Result<(), CacheError> {
        let key = SnapshotKey::for_snapshot(snapshot).render();
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        // Insert replaces the whole entry: delete-then-set semantics.
        map.insert(
            key,
            Entry {
                expires_at: Instant::now() + ttl,
                snapshot: snapshot.clone(),
            },
        );
        Ok(())
    }

    async fn invalidate_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<(), CacheError> {
        let prefix = SnapshotKey::user_prefix(tenant_id, user_id);
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        map.retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> Result<(), CacheError> {
        let prefix = SnapshotKey::tenant_prefix(tenant_id);
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        map.retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }
}
