//! Role assignments: who holds which role, where, and until when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use talentgrid_core::{AssignmentId, RoleId, UserId};

use crate::scope::ScopeRef;

/// A user-role binding at one scope instance.
///
/// Expired assignments are excluded at read time by the store adapter;
/// the rows themselves are never eagerly deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub role_id: RoleId,
    pub scope: ScopeRef,
    /// Whether this assignment propagates to descendant scope types.
    pub inherit: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl RoleAssignment {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if expiry <= now)
    }

    /// Whether this assignment contributes to resolution at `target`.
    ///
    /// Either the assignment's scope matches the target exactly, or the
    /// inherit flag is set and the assignment's scope *type* is an ancestor
    /// of the target's. Inheritance is type-based only: a subsidiary-level
    /// inheriting assignment reaches every talent in the tenant, not just
    /// talents structurally under that subsidiary.
    pub fn applies_to(&self, target: &ScopeRef) -> bool {
        if self.scope == *target {
            return true;
        }
        self.inherit && self.scope.scope_type.is_ancestor_of(target.scope_type)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use talentgrid_core::ScopeId;

    use super::*;

    fn assignment(scope: ScopeRef, inherit: bool) -> RoleAssignment {
        RoleAssignment {
            assignment_id: AssignmentId::new(),
            user_id: UserId::new(),
            role_id: RoleId::new(),
            scope,
            inherit,
            expires_at: None,
        }
    }

    #[test]
    fn exact_scope_match_applies_regardless_of_inherit() {
        let talent = ScopeRef::talent(ScopeId::new());
        assert!(assignment(talent, false).applies_to(&talent));
    }

    #[test]
    fn tenant_assignment_with_inherit_reaches_talent() {
        let a = assignment(ScopeRef::tenant_root(), true);
        assert!(a.applies_to(&ScopeRef::talent(ScopeId::new())));
        assert!(a.applies_to(&ScopeRef::subsidiary(ScopeId::new())));
    }

    #[test]
    fn tenant_assignment_without_inherit_stays_at_root() {
        let a = assignment(ScopeRef::tenant_root(), false);
        assert!(a.applies_to(&ScopeRef::tenant_root()));
        assert!(!a.applies_to(&ScopeRef::talent(ScopeId::new())));
    }

    #[test]
    fn inheritance_is_type_based_not_instance_based() {
        // An inheriting subsidiary assignment reaches a talent that is not
        // structurally under it. Intentional flat-inheritance behavior.
        let a = assignment(ScopeRef::subsidiary(ScopeId::new()), true);
        assert!(a.applies_to(&ScopeRef::talent(ScopeId::new())));
    }

    #[test]
    fn inheritance_never_flows_upward() {
        let a = assignment(ScopeRef::talent(ScopeId::new()), true);
        assert!(!a.applies_to(&ScopeRef::tenant_root()));
        assert!(!a.applies_to(&ScopeRef::subsidiary(ScopeId::new())));
    }

    #[test]
    fn sibling_scope_of_same_type_does_not_apply() {
        let a = assignment(ScopeRef::talent(ScopeId::new()), true);
        assert!(!a.applies_to(&ScopeRef::talent(ScopeId::new())));
    }

    #[test]
    fn expiry_is_strict_past_check() {
        let now = Utc::now();
        let mut a = assignment(ScopeRef::tenant_root(), true);

        assert!(!a.is_expired(now));

        a.expires_at = Some(now - Duration::seconds(1));
        assert!(a.is_expired(now));

        a.expires_at = Some(now + Duration::hours(1));
        assert!(!a.is_expired(now));
    }
}
