//! Authorization check API.
//!
//! `AuthzEngine` is the single surface the rest of the application may
//! call. It answers three-state permission queries from cached snapshots,
//! rebuilding synchronously on a miss, and exposes the coarse-grained
//! invalidation hooks that mutating components must call.
//!
//! Failure policy: store failures and timeouts fail closed (`Deny`); cache
//! failures alone degrade to a rebuild from the store, which remains
//! authoritative.

use std::time::Duration;

use thiserror::Error;
use tracing::{instrument, warn};

use talentgrid_authz::{
    applicable_assignments, resolve_effects, scopes_to_resolve, Action, Effect,
    PermissionSnapshot, PolicyGrant, ResourceCode, RoleAssignment, ScopeRef,
};
use talentgrid_core::{DomainError, TenantId, UserId};

use crate::assignment_store::{AssignmentStore, AssignmentStoreError};
use crate::snapshot_cache::{CacheError, SnapshotCache, SnapshotKey};

/// Outcome of one authorization check.
///
/// `Unset` means no applicable role expressed an opinion; the enforcement
/// boundary is expected to treat it as a denial (deny-by-default).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Decision {
    Grant,
    Deny,
    Unset,
}

impl Decision {
    fn from_effect(effect: Option<Effect>) -> Self {
        match effect {
            Some(Effect::Grant) => Decision::Grant,
            Some(Effect::Deny) => Decision::Deny,
            None => Decision::Unset,
        }
    }

    /// Whether the check resolved to an explicit grant.
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Grant)
    }
}

/// Engine failure, surfaced by the rebuild and invalidation paths.
///
/// `check()` itself never returns an error: any failure there resolves to
/// `Decision::Deny`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] AssignmentStoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("timed out after {0:?} waiting on {1}")]
    Timeout(Duration, &'static str),
}

/// Engine tuning knobs.
#[derive(Debug, Copy, Clone)]
pub struct EngineConfig {
    /// TTL stamped on every snapshot write; the backstop for missed
    /// invalidations.
    pub snapshot_ttl: Duration,
    /// Upper bound on any single store or cache call.
    pub io_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl: Duration::from_secs(24 * 60 * 60),
            io_timeout: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    /// Read overrides from `TALENTGRID_SNAPSHOT_TTL_SECS` and
    /// `TALENTGRID_AUTHZ_IO_TIMEOUT_MS`, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = read_env_u64("TALENTGRID_SNAPSHOT_TTL_SECS") {
            config.snapshot_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = read_env_u64("TALENTGRID_AUTHZ_IO_TIMEOUT_MS") {
            config.io_timeout = Duration::from_millis(ms);
        }
        config
    }
}

fn read_env_u64(name: &str) -> Option<u64> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(var = name, value = %raw, "ignoring unparseable environment override");
                None
            }
        },
        Err(_) => None,
    }
}

/// The scoped authorization engine: cache in front, builder behind.
///
/// Stateless compute over an external store and an external cache; checks
/// for different users and tenants proceed fully in parallel with no
/// coordination. The one tolerated race is that a permission change is not
/// instantly visible to a check already in flight; the snapshot TTL is the
/// backstop.
pub struct AuthzEngine<S, C> {
    store: S,
    cache: C,
    config: EngineConfig,
}

impl<S, C> AuthzEngine<S, C>
where
    S: AssignmentStore,
    C: SnapshotCache,
{
    pub fn new(store: S, cache: C, config: EngineConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Answer one resource-action query at one scope.
    ///
    /// Cache hit answers directly; a miss rebuilds only the requested
    /// scope inline (not the user's full scope set) to bound latency.
    /// Never fails open: store failure or timeout yields `Deny`.
    #[instrument(
        skip(self, resource),
        fields(
            tenant_id = %tenant_id,
            user_id = %user_id,
            resource = %resource,
            action = %action,
            scope = %scope
        )
    )]
    pub async fn check(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        resource: &ResourceCode,
        action: Action,
        scope: ScopeRef,
    ) -> Decision {
        if let Err(e) = scope.validate() {
            warn!(error = %e, "rejecting check against inconsistent scope");
            return Decision::Deny;
        }

        let key = SnapshotKey::new(tenant_id, user_id, scope);
        match self.io("cache get", self.cache.get(&key)).await {
            Ok(Some(snapshot)) => {
                return Decision::from_effect(snapshot.effect_for(resource, action));
            }
            Ok(None) => {}
            Err(e) => {
                // Cache trouble alone never fails a check closed; the
                // store is authoritative.
                warn!(error = %e, "snapshot cache unavailable, rebuilding from store");
            }
        }

        match self.build_scope_snapshot(tenant_id, user_id, &scope).await {
            Ok(snapshot) => {
                if let Err(e) = self
                    .io("cache put", self.cache.put(&snapshot, self.config.snapshot_ttl))
                    .await
                {
                    warn!(error = %e, "failed to cache rebuilt snapshot");
                }
                Decision::from_effect(snapshot.effect_for(resource, action))
            }
            Err(e) => {
                warn!(error = %e, "snapshot rebuild failed, failing closed");
                Decision::Deny
            }
        }
    }

    /// Rebuild and cache every snapshot in a user's scope set.
    ///
    /// Scopes are written as they complete; a failure aborts the batch but
    /// leaves already-written snapshots in place.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, user_id = %user_id), err)]
    pub async fn rebuild_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Vec<PermissionSnapshot>, EngineError> {
        let assignments = self
            .io(
                "active assignments",
                self.store.active_assignments(tenant_id, user_id),
            )
            .await?;

        let mut written = Vec::new();
        for scope in scopes_to_resolve(&assignments) {
            let snapshot = self
                .resolve_scope(tenant_id, user_id, &assignments, &scope)
                .await?;
            self.io("cache put", self.cache.put(&snapshot, self.config.snapshot_ttl))
                .await?;
            written.push(snapshot);
        }

        Ok(written)
    }

    /// Invalidation hook for assignment-scoped mutations.
    ///
    /// Must be called by the mutating component as part of the same
    /// logical operation, not fire-and-forget.
    pub async fn on_assignment_changed(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<(), EngineError> {
        self.io(
            "invalidate user",
            self.cache.invalidate_user(tenant_id, user_id),
        )
        .await
    }

    /// Invalidation hook for role mutations (shared by many assignments):
    /// tenant-wide, coarse-grained by design.
    pub async fn on_role_changed(&self, tenant_id: TenantId) -> Result<(), EngineError> {
        self.io("invalidate tenant", self.cache.invalidate_tenant(tenant_id))
            .await
    }

    /// Invalidation hook for policy or role-policy-link mutations.
    pub async fn on_policy_changed(&self, tenant_id: TenantId) -> Result<(), EngineError> {
        self.io("invalidate tenant", self.cache.invalidate_tenant(tenant_id))
            .await
    }

    async fn build_scope_snapshot(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        scope: &ScopeRef,
    ) -> Result<PermissionSnapshot, EngineError> {
        let assignments = self
            .io(
                "active assignments",
                self.store.active_assignments(tenant_id, user_id),
            )
            .await?;
        self.resolve_scope(tenant_id, user_id, &assignments, scope)
            .await
    }

    /// Gather every applicable role's policy tuples and resolve them.
    ///
    /// A fetch failure for any one role abandons the whole scope — stale
    /// or absent data is preferred to partially-correct data.
    async fn resolve_scope(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        assignments: &[RoleAssignment],
        scope: &ScopeRef,
    ) -> Result<PermissionSnapshot, EngineError> {
        let mut grants: Vec<PolicyGrant> = Vec::new();
        for assignment in applicable_assignments(assignments, scope) {
            let policies = self
                .io(
                    "role policies",
                    self.store.role_policies(tenant_id, assignment.role_id),
                )
                .await?;
            grants.extend(policies);
        }

        Ok(PermissionSnapshot::new(
            tenant_id,
            user_id,
            *scope,
            resolve_effects(grants),
        ))
    }

    async fn io<T, E, F>(&self, what: &'static str, fut: F) -> Result<T, EngineError>
    where
        F: std::future::Future<Output = Result<T, E>>,
        EngineError: From<E>,
    {
        match tokio::time::timeout(self.config.io_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(EngineError::Timeout(self.config.io_timeout, what)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_mapping() {
        assert_eq!(Decision::from_effect(Some(Effect::Grant)), Decision::Grant);
        assert_eq!(Decision::from_effect(Some(Effect::Deny)), Decision::Deny);
        assert_eq!(Decision::from_effect(None), Decision::Unset);

        assert!(Decision::Grant.is_granted());
        assert!(!Decision::Deny.is_granted());
        assert!(!Decision::Unset.is_granted());
    }

    #[test]
    fn config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.snapshot_ttl, Duration::from_secs(86_400));
        assert_eq!(config.io_timeout, Duration::from_secs(2));
    }
}
