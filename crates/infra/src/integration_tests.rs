//! End-to-end scenarios over the in-memory store and cache.
//!
//! These exercise the full check path: cache lookup, synchronous rebuild
//! on miss, inheritance across scope levels, deny precedence, expiry,
//! invalidation, and the failure policy.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use talentgrid_authz::{
    Action, Effect, PolicyGrant, ResourceCode, RoleAssignment, ScopeRef,
};
use talentgrid_core::{AssignmentId, RoleId, ScopeId, TenantId, UserId};

use crate::assignment_store::InMemoryAssignmentStore;
use crate::engine::{AuthzEngine, Decision, EngineConfig};
use crate::snapshot_cache::{CacheError, InMemorySnapshotCache, SnapshotCache, SnapshotKey};

type TestEngine = AuthzEngine<Arc<InMemoryAssignmentStore>, Arc<InMemorySnapshotCache>>;

struct Fixture {
    tenant: TenantId,
    user: UserId,
    store: Arc<InMemoryAssignmentStore>,
    cache: Arc<InMemorySnapshotCache>,
    engine: TestEngine,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(InMemoryAssignmentStore::new());
        let cache = Arc::new(InMemorySnapshotCache::new());
        let engine = AuthzEngine::new(store.clone(), cache.clone(), EngineConfig::default());
        Self {
            tenant: TenantId::new(),
            user: UserId::new(),
            store,
            cache,
            engine,
        }
    }

    fn assign(&self, role_id: RoleId, scope: ScopeRef, inherit: bool) -> RoleAssignment {
        let assignment = RoleAssignment {
            assignment_id: AssignmentId::new(),
            user_id: self.user,
            role_id,
            scope,
            inherit,
            expires_at: None,
        };
        self.store.upsert_assignment(self.tenant, assignment.clone());
        assignment
    }

    fn role_with(&self, grants: &[(&'static str, Action, Effect)]) -> RoleId {
        let role_id = RoleId::new();
        for (resource, action, effect) in grants {
            self.store.upsert_role_policy(
                self.tenant,
                role_id,
                PolicyGrant::new(*resource, *action, *effect),
            );
        }
        role_id
    }

    async fn check(&self, resource: &str, action: Action, scope: ScopeRef) -> Decision {
        self.engine
            .check(
                self.tenant,
                self.user,
                &ResourceCode::new(resource.to_string()),
                action,
                scope,
            )
            .await
    }
}

#[tokio::test]
async fn tenant_level_inheriting_grant_is_visible_at_talent_scope() {
    let fx = Fixture::new();

    let viewer = fx.role_with(&[("customer.profile", Action::Read, Effect::Grant)]);
    fx.assign(viewer, ScopeRef::tenant_root(), true);

    let talent = ScopeRef::talent(ScopeId::new());
    assert_eq!(
        fx.check("customer.profile", Action::Read, talent).await,
        Decision::Grant
    );
}

#[tokio::test]
async fn talent_scoped_deny_overrides_inherited_grant_only_at_that_talent() {
    let fx = Fixture::new();
    let t1 = ScopeRef::talent(ScopeId::new());
    let t2 = ScopeRef::talent(ScopeId::new());

    let viewer = fx.role_with(&[("customer.pii", Action::Read, Effect::Grant)]);
    fx.assign(viewer, ScopeRef::tenant_root(), true);

    let pii_restricted = fx.role_with(&[("customer.pii", Action::Read, Effect::Deny)]);
    fx.assign(pii_restricted, t1, false);

    assert_eq!(fx.check("customer.pii", Action::Read, t1).await, Decision::Deny);
    assert_eq!(fx.check("customer.pii", Action::Read, t2).await, Decision::Grant);
}

#[tokio::test]
async fn unknown_resource_resolves_unset() {
    let fx = Fixture::new();

    let viewer = fx.role_with(&[("customer.profile", Action::Read, Effect::Grant)]);
    fx.assign(viewer, ScopeRef::tenant_root(), true);

    assert_eq!(
        fx.check("payroll.run", Action::Approve, ScopeRef::tenant_root())
            .await,
        Decision::Unset
    );
}

#[tokio::test]
async fn expired_assignment_contributes_nothing() {
    let fx = Fixture::new();

    let viewer = fx.role_with(&[("customer.profile", Action::Read, Effect::Grant)]);
    let mut assignment = fx.assign(viewer, ScopeRef::tenant_root(), true);
    assignment.expires_at = Some(Utc::now() - chrono::Duration::minutes(5));
    // Row still exists in the store, just expired.
    fx.store.upsert_assignment(fx.tenant, assignment);

    assert_eq!(
        fx.check("customer.profile", Action::Read, ScopeRef::tenant_root())
            .await,
        Decision::Unset
    );
}

#[tokio::test]
async fn check_populates_cache_and_serves_hits_from_it() {
    let fx = Fixture::new();
    let scope = ScopeRef::tenant_root();

    let viewer = fx.role_with(&[("customer.profile", Action::Read, Effect::Grant)]);
    fx.assign(viewer, scope, false);

    assert!(fx.cache.is_empty());
    assert_eq!(
        fx.check("customer.profile", Action::Read, scope).await,
        Decision::Grant
    );
    assert_eq!(fx.cache.len(), 1);

    // Mutate the store WITHOUT invalidating: the cached snapshot still
    // answers. This is the tolerated staleness window, bounded by TTL.
    fx.store.remove_role(fx.tenant, viewer);
    assert_eq!(
        fx.check("customer.profile", Action::Read, scope).await,
        Decision::Grant
    );
}

#[tokio::test]
async fn invalidation_forces_synchronous_rebuild_with_fresh_value() {
    let fx = Fixture::new();
    let scope = ScopeRef::tenant_root();
    let resource = ResourceCode::new("customer.profile");

    let viewer = fx.role_with(&[("customer.profile", Action::Read, Effect::Grant)]);
    fx.assign(viewer, scope, false);

    assert_eq!(
        fx.check("customer.profile", Action::Read, scope).await,
        Decision::Grant
    );

    // Role-policy change: deactivate the link, then invalidate tenant-wide.
    fx.store
        .set_link_active(fx.tenant, viewer, &resource, Action::Read, false);
    fx.engine.on_policy_changed(fx.tenant).await.unwrap();

    assert_eq!(
        fx.check("customer.profile", Action::Read, scope).await,
        Decision::Unset
    );
}

#[tokio::test]
async fn assignment_change_invalidates_only_that_user() {
    let fx = Fixture::new();
    let other_user = UserId::new();
    let scope = ScopeRef::tenant_root();

    let viewer = fx.role_with(&[("customer.profile", Action::Read, Effect::Grant)]);
    fx.assign(viewer, scope, false);
    fx.store.upsert_assignment(
        fx.tenant,
        RoleAssignment {
            assignment_id: AssignmentId::new(),
            user_id: other_user,
            role_id: viewer,
            scope,
            inherit: false,
            expires_at: None,
        },
    );

    fx.check("customer.profile", Action::Read, scope).await;
    fx.engine
        .check(
            fx.tenant,
            other_user,
            &ResourceCode::new("customer.profile"),
            Action::Read,
            scope,
        )
        .await;
    assert_eq!(fx.cache.len(), 2);

    fx.engine
        .on_assignment_changed(fx.tenant, fx.user)
        .await
        .unwrap();

    assert_eq!(fx.cache.len(), 1);
    let other_key = SnapshotKey::new(fx.tenant, other_user, scope);
    assert!(fx.cache.get(&other_key).await.unwrap().is_some());
}

#[tokio::test]
async fn store_outage_fails_closed() {
    let fx = Fixture::new();
    let scope = ScopeRef::tenant_root();

    let viewer = fx.role_with(&[("customer.profile", Action::Read, Effect::Grant)]);
    fx.assign(viewer, scope, false);

    fx.store.set_unavailable(true);

    // Cache is empty, store is down: the check must deny, never grant.
    assert_eq!(
        fx.check("customer.profile", Action::Read, scope).await,
        Decision::Deny
    );
}

#[tokio::test]
async fn inconsistent_scope_reference_is_denied() {
    let fx = Fixture::new();
    let bad_scope = ScopeRef {
        scope_type: talentgrid_authz::ScopeType::Talent,
        scope_id: None,
    };

    assert_eq!(
        fx.check("customer.profile", Action::Read, bad_scope).await,
        Decision::Deny
    );
}

#[tokio::test]
async fn dangling_assignment_does_not_block_other_roles() {
    let fx = Fixture::new();
    let scope = ScopeRef::tenant_root();

    let viewer = fx.role_with(&[("customer.profile", Action::Read, Effect::Grant)]);
    fx.assign(viewer, scope, false);

    // Assignment against a role that no longer exists: resolves as an
    // empty policy set, not an error.
    fx.assign(RoleId::new(), scope, false);

    assert_eq!(
        fx.check("customer.profile", Action::Read, scope).await,
        Decision::Grant
    );
}

#[tokio::test]
async fn rebuild_user_always_writes_the_tenant_root_snapshot() {
    let fx = Fixture::new();

    // No assignments at all: still one snapshot, at the root, empty.
    let written = fx.engine.rebuild_user(fx.tenant, fx.user).await.unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].scope, ScopeRef::tenant_root());
    assert!(written[0].is_empty());
    assert_eq!(fx.cache.len(), 1);
}

#[tokio::test]
async fn rebuild_user_covers_every_assignment_scope() {
    let fx = Fixture::new();
    let subsidiary = ScopeRef::subsidiary(ScopeId::new());
    let talent = ScopeRef::talent(ScopeId::new());

    let viewer = fx.role_with(&[("customer.profile", Action::Read, Effect::Grant)]);
    fx.assign(viewer, subsidiary, true);
    fx.assign(viewer, talent, false);

    let written = fx.engine.rebuild_user(fx.tenant, fx.user).await.unwrap();
    let scopes: Vec<ScopeRef> = written.iter().map(|s| s.scope).collect();

    assert_eq!(written.len(), 3);
    assert_eq!(scopes[0], ScopeRef::tenant_root());
    assert!(scopes.contains(&subsidiary));
    assert!(scopes.contains(&talent));
}

/// Cache stub whose every operation fails, to prove the degrade path.
struct DownCache;

#[async_trait::async_trait]
impl SnapshotCache for DownCache {
    async fn get(
        &self,
        _key: &SnapshotKey,
    ) -> Result<Option<talentgrid_authz::PermissionSnapshot>, CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }

    async fn put(
        &self,
        _snapshot: &talentgrid_authz::PermissionSnapshot,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }

    async fn invalidate_user(
        &self,
        _tenant_id: TenantId,
        _user_id: UserId,
    ) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }

    async fn invalidate_tenant(&self, _tenant_id: TenantId) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }
}

#[tokio::test]
async fn cache_outage_degrades_to_store_rebuild_not_denial() {
    let store = Arc::new(InMemoryAssignmentStore::new());
    let engine = AuthzEngine::new(store.clone(), DownCache, EngineConfig::default());

    let tenant = TenantId::new();
    let user = UserId::new();
    let role = RoleId::new();
    store.upsert_role_policy(
        tenant,
        role,
        PolicyGrant::new("customer.profile", Action::Read, Effect::Grant),
    );
    store.upsert_assignment(
        tenant,
        RoleAssignment {
            assignment_id: AssignmentId::new(),
            user_id: user,
            role_id: role,
            scope: ScopeRef::tenant_root(),
            inherit: true,
            expires_at: None,
        },
    );

    let decision = engine
        .check(
            tenant,
            user,
            &ResourceCode::new("customer.profile"),
            Action::Read,
            ScopeRef::tenant_root(),
        )
        .await;

    assert_eq!(decision, Decision::Grant);
}
