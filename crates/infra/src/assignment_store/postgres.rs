//! Postgres-backed assignment store.
//!
//! Every query carries `tenant_id` in the WHERE clause, making cross-tenant
//! reads architecturally impossible. The store is strictly read-only: role,
//! policy, and assignment mutation belongs to the administration layer.
//!
//! ## Error Mapping
//!
//! All sqlx failures (connectivity, pool exhaustion, statement errors) map
//! to `AssignmentStoreError::Unavailable` — retryable from the engine's
//! point of view. Rows that cannot be decoded into the domain model map to
//! `Inconsistent`, which the engine also treats as a failed fetch rather
//! than attempting partial resolution.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use talentgrid_authz::{Action, Effect, PolicyGrant, ResourceCode, RoleAssignment, ScopeRef, ScopeType};
use talentgrid_core::{AssignmentId, RoleId, ScopeId, TenantId, UserId};

use super::{AssignmentStore, AssignmentStoreError};

/// Postgres-backed, tenant-scoped assignment queries.
///
/// Uses the sqlx connection pool (thread-safe, `Arc + Send + Sync`).
#[derive(Debug, Clone)]
pub struct PostgresAssignmentStore {
    pool: Arc<PgPool>,
}

impl PostgresAssignmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn unavailable(op: &str, e: sqlx::Error) -> AssignmentStoreError {
    AssignmentStoreError::Unavailable(format!("{op}: {e}"))
}

fn inconsistent(op: &str, detail: impl std::fmt::Display) -> AssignmentStoreError {
    AssignmentStoreError::Inconsistent(format!("{op}: {detail}"))
}

#[async_trait::async_trait]
impl AssignmentStore for PostgresAssignmentStore {
    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id, user_id = %user_id),
        err
    )]
    async fn active_assignments(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Vec<RoleAssignment>, AssignmentStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                assignment_id,
                user_id,
                role_id,
                scope_type,
                scope_id,
                inherit,
                expires_at
            FROM role_assignments
            WHERE tenant_id = $1
              AND user_id = $2
              AND (expires_at IS NULL OR expires_at > NOW())
            ORDER BY assignment_id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| unavailable("active_assignments", e))?;

        let mut assignments = Vec::with_capacity(rows.len());
        for row in rows {
            let scope_type: String = row
                .try_get("scope_type")
                .map_err(|e| inconsistent("active_assignments", e))?;
            let scope_type = ScopeType::from_str(&scope_type)
                .map_err(|e| inconsistent("active_assignments", e))?;
            let scope_id: Option<Uuid> = row
                .try_get("scope_id")
                .map_err(|e| inconsistent("active_assignments", e))?;

            let scope = ScopeRef {
                scope_type,
                scope_id: scope_id.map(ScopeId::from_uuid),
            };
            scope
                .validate()
                .map_err(|e| inconsistent("active_assignments", e))?;

            assignments.push(RoleAssignment {
                assignment_id: AssignmentId::from_uuid(
                    row.try_get("assignment_id")
                        .map_err(|e| inconsistent("active_assignments", e))?,
                ),
                user_id: UserId::from_uuid(
                    row.try_get("user_id")
                        .map_err(|e| inconsistent("active_assignments", e))?,
                ),
                role_id: RoleId::from_uuid(
                    row.try_get("role_id")
                        .map_err(|e| inconsistent("active_assignments", e))?,
                ),
                scope,
                inherit: row
                    .try_get("inherit")
                    .map_err(|e| inconsistent("active_assignments", e))?,
                expires_at: row
                    .try_get("expires_at")
                    .map_err(|e| inconsistent("active_assignments", e))?,
            });
        }

        Ok(assignments)
    }

    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id, role_id = %role_id),
        err
    )]
    async fn role_policies(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> Result<Vec<PolicyGrant>, AssignmentStoreError> {
        // A join against roles drops dangling assignments' policies to the
        // empty set; the engine treats that as "no opinion", not an error.
        let rows = sqlx::query(
            r#"
            SELECT
                p.resource_code,
                p.action,
                rp.effect
            FROM role_policies rp
            JOIN roles r
              ON r.tenant_id = rp.tenant_id AND r.role_id = rp.role_id
            JOIN policies p
              ON p.tenant_id = rp.tenant_id AND p.policy_id = rp.policy_id
            WHERE rp.tenant_id = $1
              AND rp.role_id = $2
              AND rp.active
              AND r.active
              AND p.active
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| unavailable("role_policies", e))?;

        let mut grants = Vec::with_capacity(rows.len());
        for row in rows {
            let resource: String = row
                .try_get("resource_code")
                .map_err(|e| inconsistent("role_policies", e))?;
            let action: String = row
                .try_get("action")
                .map_err(|e| inconsistent("role_policies", e))?;
            let effect: String = row
                .try_get("effect")
                .map_err(|e| inconsistent("role_policies", e))?;

            grants.push(PolicyGrant {
                resource: ResourceCode::new(resource),
                action: Action::from_str(&action).map_err(|e| inconsistent("role_policies", e))?,
                effect: Effect::from_str(&effect).map_err(|e| inconsistent("role_policies", e))?,
            });
        }

        Ok(grants)
    }
}
