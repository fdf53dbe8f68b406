//! In-memory assignment store.
//!
//! Intended for tests/dev. Mutation helpers mirror what the real
//! administration layer does to the relational tables, so integration
//! tests can exercise invalidation flows end to end.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use chrono::Utc;

use talentgrid_authz::{Action, Effect, PolicyGrant, ResourceCode, RoleAssignment};
use talentgrid_core::{RoleId, TenantId, UserId};

use super::{AssignmentStore, AssignmentStoreError};

#[derive(Debug, Clone)]
struct StoredLink {
    grant: PolicyGrant,
    link_active: bool,
    policy_active: bool,
}

/// In-memory, tenant-isolated assignment store.
#[derive(Debug, Default)]
pub struct InMemoryAssignmentStore {
    assignments: RwLock<HashMap<(TenantId, UserId), Vec<RoleAssignment>>>,
    role_links: RwLock<HashMap<(TenantId, RoleId), Vec<StoredLink>>>,
    unavailable: AtomicBool,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a store outage (every query fails retryably) for tests.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn upsert_assignment(&self, tenant_id: TenantId, assignment: RoleAssignment) {
        if let Ok(mut map) = self.assignments.write() {
            let rows = map.entry((tenant_id, assignment.user_id)).or_default();
            rows.retain(|a| a.assignment_id != assignment.assignment_id);
            rows.push(assignment);
        }
    }

    pub fn remove_assignment(&self, tenant_id: TenantId, user_id: UserId, assignment: &RoleAssignment) {
        if let Ok(mut map) = self.assignments.write() {
            if let Some(rows) = map.get_mut(&(tenant_id, user_id)) {
                rows.retain(|a| a.assignment_id != assignment.assignment_id);
            }
        }
    }

    /// Link a role to a policy; both the link and the policy start active.
    pub fn upsert_role_policy(&self, tenant_id: TenantId, role_id: RoleId, grant: PolicyGrant) {
        if let Ok(mut map) = self.role_links.write() {
            let links = map.entry((tenant_id, role_id)).or_default();
            links.retain(|l| {
                !(l.grant.resource == grant.resource && l.grant.action == grant.action)
            });
            links.push(StoredLink {
                grant,
                link_active: true,
                policy_active: true,
            });
        }
    }

    /// Deactivate/reactivate the underlying policy across every role link.
    pub fn set_policy_active(
        &self,
        tenant_id: TenantId,
        resource: &ResourceCode,
        action: Action,
        active: bool,
    ) {
        if let Ok(mut map) = self.role_links.write() {
            for ((t, _), links) in map.iter_mut() {
                if *t != tenant_id {
                    continue;
                }
                for link in links.iter_mut() {
                    if link.grant.resource == *resource && link.grant.action == action {
                        link.policy_active = active;
                    }
                }
            }
        }
    }

    /// Deactivate/reactivate a single role-policy link.
    pub fn set_link_active(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        resource: &ResourceCode,
        action: Action,
        active: bool,
    ) {
        if let Ok(mut map) = self.role_links.write() {
            if let Some(links) = map.get_mut(&(tenant_id, role_id)) {
                for link in links.iter_mut() {
                    if link.grant.resource == *resource && link.grant.action == action {
                        link.link_active = active;
                    }
                }
            }
        }
    }

    /// Remove a role and all of its links (simulates a deleted role that
    /// assignments may still dangle against).
    pub fn remove_role(&self, tenant_id: TenantId, role_id: RoleId) {
        if let Ok(mut map) = self.role_links.write() {
            map.remove(&(tenant_id, role_id));
        }
    }

    fn check_available(&self) -> Result<(), AssignmentStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(AssignmentStoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn active_assignments(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Vec<RoleAssignment>, AssignmentStoreError> {
        self.check_available()?;

        let map = self
            .assignments
            .read()
            .map_err(|_| AssignmentStoreError::Unavailable("lock poisoned".to_string()))?;

        let now = Utc::now();
        Ok(map
            .get(&(tenant_id, user_id))
            .map(|rows| {
                rows.iter()
                    .filter(|a| !a.is_expired(now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn role_policies(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> Result<Vec<PolicyGrant>, AssignmentStoreError> {
        self.check_available()?;

        let map = self
            .role_links
            .read()
            .map_err(|_| AssignmentStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(map
            .get(&(tenant_id, role_id))
            .map(|links| {
                links
                    .iter()
                    .filter(|l| l.link_active && l.policy_active)
                    .map(|l| l.grant.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
