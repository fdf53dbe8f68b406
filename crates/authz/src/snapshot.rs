//! Materialized permission snapshots and scope enumeration.
//!
//! A snapshot is derived data: it must always be reproducible from the
//! role assignments and role-policy links it was built from, and may be
//! deleted and rebuilt at any time without semantic loss.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use talentgrid_core::{TenantId, UserId};

use crate::assignment::RoleAssignment;
use crate::policy::{Action, Effect, PermissionKey, ResourceCode};
use crate::scope::ScopeRef;

/// Effective permissions for one (tenant, user, scope) tuple.
///
/// An entry is present only if at least one applicable role contributed a
/// grant or deny for that policy; absence means "no opinion".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSnapshot {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub scope: ScopeRef,
    pub entries: BTreeMap<PermissionKey, Effect>,
    pub built_at: DateTime<Utc>,
}

impl PermissionSnapshot {
    pub fn new(
        tenant_id: TenantId,
        user_id: UserId,
        scope: ScopeRef,
        entries: BTreeMap<PermissionKey, Effect>,
    ) -> Self {
        Self {
            tenant_id,
            user_id,
            scope,
            entries,
            built_at: Utc::now(),
        }
    }

    /// The resolved effect for one resource-action pair, if any role had
    /// an opinion.
    pub fn effect_for(&self, resource: &ResourceCode, action: Action) -> Option<Effect> {
        self.entries
            .get(&PermissionKey::new(resource, action))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Enumerate the scopes to resolve for a user's snapshot rebuild.
///
/// The tenant root scope is always first, even when the user has no
/// assignment literally at that scope, so every user ends up with at least
/// one (possibly empty) snapshot. Remaining scopes are the distinct
/// assignment scopes in sorted order, so enumeration is deterministic.
pub fn scopes_to_resolve(assignments: &[RoleAssignment]) -> Vec<ScopeRef> {
    let root = ScopeRef::tenant_root();
    let mut scopes = vec![root];

    let mut rest: Vec<ScopeRef> = assignments
        .iter()
        .map(|a| a.scope)
        .filter(|s| *s != root)
        .collect();
    rest.sort();
    rest.dedup();

    scopes.extend(rest);
    scopes
}

/// The assignments that contribute to resolution at `target`.
pub fn applicable_assignments<'a>(
    assignments: &'a [RoleAssignment],
    target: &ScopeRef,
) -> Vec<&'a RoleAssignment> {
    assignments.iter().filter(|a| a.applies_to(target)).collect()
}
