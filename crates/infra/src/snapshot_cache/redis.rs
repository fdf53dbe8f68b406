//! Redis-backed snapshot cache (optional).
//!
//! One Redis hash per snapshot key, one field per `resource:action`, plus
//! a reserved `__built_at` metadata field (which also keeps hashes for
//! empty snapshots from collapsing into misses). Writes are a
//! DEL + HSET + EXPIRE pipeline so stale fields never survive a rebuild,
//! and Redis's own TTL mechanism handles expiry.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use redis::Commands;

use talentgrid_authz::{Effect, PermissionKey, PermissionSnapshot};
use talentgrid_core::{TenantId, UserId};

use super::{CacheError, SnapshotCache, SnapshotKey};

const BUILT_AT_FIELD: &str = "__built_at";

/// Redis hash-per-snapshot cache.
#[derive(Debug, Clone)]
pub struct RedisSnapshotCache {
    client: redis::Client,
}

impl RedisSnapshotCache {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(Self { client })
    }

    fn conn(&self) -> Result<redis::Connection, CacheError> {
        self.client
            .get_connection()
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    fn delete_by_pattern(&self, pattern: &str) -> Result<(), CacheError> {
        let mut conn = self.conn()?;

        let keys: Vec<String> = {
            let iter = conn
                .scan_match::<_, String>(pattern)
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;
            iter.collect()
        };

        if !keys.is_empty() {
            conn.del::<_, ()>(keys)
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl SnapshotCache for RedisSnapshotCache {
    async fn get(&self, key: &SnapshotKey) -> Result<Option<PermissionSnapshot>, CacheError> {
        let mut conn = self.conn()?;

        let fields: Vec<(String, String)> = conn
            .hgetall(key.render())
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        if fields.is_empty() {
            return Ok(None);
        }

        let mut entries = std::collections::BTreeMap::new();
        let mut built_at: Option<DateTime<Utc>> = None;

        for (field, value) in fields {
            if field == BUILT_AT_FIELD {
                built_at = Some(
                    DateTime::parse_from_rfc3339(&value)
                        .map_err(|e| CacheError::Corrupt(format!("built_at: {e}")))?
                        .with_timezone(&Utc),
                );
                continue;
            }

            let (resource, action) = PermissionKey::parse(&field)
                .map_err(|e| CacheError::Corrupt(format!("field '{field}': {e}")))?;
            let effect = Effect::from_str(&value)
                .map_err(|e| CacheError::Corrupt(format!("field '{field}': {e}")))?;
            entries.insert(PermissionKey::new(&resource, action), effect);
        }

        let built_at = built_at
            .ok_or_else(|| CacheError::Corrupt(format!("{key}: missing {BUILT_AT_FIELD}")))?;

        Ok(Some(PermissionSnapshot {
            tenant_id: key.tenant_id,
            user_id: key.user_id,
            scope: key.scope,
            entries,
            built_at,
        }))
    }

    async fn put(&self, snapshot: &PermissionSnapshot, ttl: Duration) -> Result<(), CacheError> {
        let key = SnapshotKey::for_snapshot(snapshot).render();

        let mut fields: Vec<(String, String)> = snapshot
            .entries
            .iter()
            .map(|(k, effect)| (k.as_str().to_string(), effect.as_str().to_string()))
            .collect();
        fields.push((BUILT_AT_FIELD.to_string(), snapshot.built_at.to_rfc3339()));

        let ttl_secs = ttl.as_secs().max(1) as i64;

        let mut conn = self.conn()?;
        redis::pipe()
            .del(&key)
            .ignore()
            .hset_multiple(&key, &fields)
            .ignore()
            .expire(&key, ttl_secs)
            .ignore()
            .query::<()>(&mut conn)
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        Ok(())
    }

    async fn invalidate_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<(), CacheError> {
        let pattern = format!("{}*", SnapshotKey::user_prefix(tenant_id, user_id));
        self.delete_by_pattern(&pattern)
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> Result<(), CacheError> {
        let pattern = format!("{}*", SnapshotKey::tenant_prefix(tenant_id));
        self.delete_by_pattern(&pattern)
    }
}
