//! `talentgrid-authz` — pure scoped-authorization domain.
//!
//! This crate holds the data model and algorithms of the authorization
//! engine: the three-level scope hierarchy, the grant/deny policy model,
//! role assignments with inheritance and expiry, the deny-wins effective
//! permission resolver, and the materialized permission snapshot.
//!
//! It is intentionally decoupled from storage and transport: no I/O, no
//! async, no panics. Store adapters, caching, and the check API live in
//! `talentgrid-infra`.

pub mod assignment;
pub mod policy;
pub mod resolver;
pub mod scope;
pub mod snapshot;

pub use assignment::RoleAssignment;
pub use policy::{Action, Effect, PermissionKey, PolicyGrant, ResourceCode};
pub use resolver::resolve_effects;
pub use scope::{ScopeRef, ScopeType};
pub use snapshot::{applicable_assignments, scopes_to_resolve, PermissionSnapshot};
