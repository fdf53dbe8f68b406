//! Read-only query surface over per-tenant role assignment data.
//!
//! The engine never writes to role/policy/assignment tables; mutation is
//! owned by the (out-of-scope) administration layer, which must call the
//! engine's invalidation hooks as part of the same logical operation.

mod in_memory;
mod postgres;

use thiserror::Error;

use talentgrid_authz::{PolicyGrant, RoleAssignment};
use talentgrid_core::{RoleId, TenantId, UserId};

pub use in_memory::InMemoryAssignmentStore;
pub use postgres::PostgresAssignmentStore;

/// Assignment store operation error.
///
/// All variants are infrastructure failures; data-shape oddities (unknown
/// user, role with no links, assignment referencing a deleted role) are
/// empty results, not errors, so one bad row cannot block resolution of a
/// user's other valid assignments.
#[derive(Debug, Error)]
pub enum AssignmentStoreError {
    /// The underlying store could not be reached; retryable.
    #[error("assignment store unavailable: {0}")]
    Unavailable(String),

    /// A row could not be mapped into the domain model.
    #[error("inconsistent assignment data: {0}")]
    Inconsistent(String),
}

/// Tenant-scoped, read-only assignment queries.
///
/// Implementations must include the tenant in every lookup; cross-tenant
/// reads are architecturally impossible through this trait.
#[async_trait::async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Active (non-expired) role assignments for a user.
    ///
    /// Unknown users yield an empty list, not an error.
    async fn active_assignments(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Vec<RoleAssignment>, AssignmentStoreError>;

    /// Policy tuples for a role, restricted to links and policies that are
    /// both active.
    ///
    /// Unknown or deleted roles yield an empty list, not an error.
    async fn role_policies(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> Result<Vec<PolicyGrant>, AssignmentStoreError>;
}

#[async_trait::async_trait]
impl<S> AssignmentStore for std::sync::Arc<S>
where
    S: AssignmentStore + ?Sized,
{
    async fn active_assignments(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Vec<RoleAssignment>, AssignmentStoreError> {
        (**self).active_assignments(tenant_id, user_id).await
    }

    async fn role_policies(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> Result<Vec<PolicyGrant>, AssignmentStoreError> {
        (**self).role_policies(tenant_id, role_id).await
    }
}
