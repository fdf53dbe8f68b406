//! Organizational scope model.
//!
//! Fixed three-level hierarchy: tenant → subsidiary → talent. A talent may
//! also attach directly under a tenant in flatter organizations; that does
//! not change the type-level ancestor relation below.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use talentgrid_core::{DomainError, DomainResult, ScopeId};

/// Level in the organizational hierarchy at which a role assignment applies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    Tenant,
    Subsidiary,
    Talent,
}

impl ScopeType {
    /// Whether `self` is an ancestor of `target` for inheritance purposes.
    ///
    /// Inheritance flows strictly downward: a type is never its own
    /// ancestor.
    pub fn is_ancestor_of(self, target: ScopeType) -> bool {
        match (self, target) {
            (ScopeType::Tenant, ScopeType::Subsidiary | ScopeType::Talent) => true,
            (ScopeType::Subsidiary, ScopeType::Talent) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::Tenant => "tenant",
            ScopeType::Subsidiary => "subsidiary",
            ScopeType::Talent => "talent",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tenant" => Ok(ScopeType::Tenant),
            "subsidiary" => Ok(ScopeType::Subsidiary),
            "talent" => Ok(ScopeType::Talent),
            other => Err(DomainError::validation(format!(
                "unknown scope type '{other}'"
            ))),
        }
    }
}

/// A concrete scope instance: a scope type plus an optional instance id.
///
/// The id is `None` only for the tenant root scope; subsidiary and talent
/// scopes always carry one. `validate()` enforces this.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeRef {
    pub scope_type: ScopeType,
    pub scope_id: Option<ScopeId>,
}

impl ScopeRef {
    /// The tenant root scope (no instance id).
    pub fn tenant_root() -> Self {
        Self {
            scope_type: ScopeType::Tenant,
            scope_id: None,
        }
    }

    pub fn subsidiary(id: ScopeId) -> Self {
        Self {
            scope_type: ScopeType::Subsidiary,
            scope_id: Some(id),
        }
    }

    pub fn talent(id: ScopeId) -> Self {
        Self {
            scope_type: ScopeType::Talent,
            scope_id: Some(id),
        }
    }

    /// Enforce the type/id consistency invariant.
    pub fn validate(&self) -> DomainResult<()> {
        match (self.scope_type, self.scope_id) {
            (ScopeType::Tenant, Some(id)) => Err(DomainError::invariant(format!(
                "tenant scope must not carry a scope id (got {id})"
            ))),
            (ScopeType::Subsidiary | ScopeType::Talent, None) => Err(DomainError::invariant(
                format!("{} scope requires a scope id", self.scope_type),
            )),
            _ => Ok(()),
        }
    }

    /// Render this scope as a composite-key segment.
    ///
    /// The null tenant-root id is rendered as a literal `-` so keys are
    /// always fully structured.
    pub fn key_segment(&self) -> String {
        match self.scope_id {
            Some(id) => format!("{}:{}", self.scope_type, id),
            None => format!("{}:-", self.scope_type),
        }
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_segment())
    }
}
