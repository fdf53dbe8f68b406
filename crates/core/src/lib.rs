//! `talentgrid-core` — shared domain primitives.
//!
//! Strongly-typed identifiers and the domain error model used by every
//! other crate in the workspace. No I/O, no business logic.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{AssignmentId, PolicyId, RoleId, ScopeId, TenantId, UserId};
