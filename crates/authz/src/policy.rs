//! Policy model: resources, actions, effects.
//!
//! A policy is the pair (resource, action) — the atomic unit that a role
//! can grant or deny. Resources are opaque codes; actions are a fixed
//! enumeration shared by all resources.

use core::fmt;
use core::str::FromStr;
use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use talentgrid_core::DomainError;

/// Resource code identifying a permission subject (e.g. "customer.profile").
///
/// Resource codes are modeled as opaque strings; the catalogue of valid
/// codes is tenant data, not something this layer hardcodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceCode(Cow<'static, str>);

impl ResourceCode {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operation on a resource. Enumerated, not resource-specific.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
    Delete,
    Admin,
    Approve,
    Export,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
            Action::Admin => "admin",
            Action::Approve => "approve",
            Action::Export => "export",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            "delete" => Ok(Action::Delete),
            "admin" => Ok(Action::Admin),
            "approve" => Ok(Action::Approve),
            "export" => Ok(Action::Export),
            other => Err(DomainError::validation(format!("unknown action '{other}'"))),
        }
    }
}

/// Effect attached to a role-policy link.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Grant,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Grant => "grant",
            Effect::Deny => "deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grant" => Ok(Effect::Grant),
            "deny" => Ok(Effect::Deny),
            other => Err(DomainError::validation(format!("unknown effect '{other}'"))),
        }
    }
}

/// One policy tuple contributed by a role: (resource, action, effect).
///
/// This is the flat shape the resolver consumes; which role contributed a
/// tuple is deliberately not carried — effect value, not role identity, is
/// the single axis of precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyGrant {
    pub resource: ResourceCode,
    pub action: Action,
    pub effect: Effect,
}

impl PolicyGrant {
    pub fn new(resource: impl Into<Cow<'static, str>>, action: Action, effect: Effect) -> Self {
        Self {
            resource: ResourceCode::new(resource),
            action,
            effect,
        }
    }

    pub fn key(&self) -> PermissionKey {
        PermissionKey::new(&self.resource, self.action)
    }
}

/// Composite `"resourceCode:action"` key used in snapshots and cache fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionKey(String);

impl PermissionKey {
    pub fn new(resource: &ResourceCode, action: Action) -> Self {
        Self(format!("{resource}:{action}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a key back into its resource and action parts.
    ///
    /// Resource codes may themselves contain `:`; the action is the final
    /// segment.
    pub fn parse(s: &str) -> Result<(ResourceCode, Action), DomainError> {
        let (resource, action) = s
            .rsplit_once(':')
            .ok_or_else(|| DomainError::validation(format!("malformed permission key '{s}'")))?;
        Ok((ResourceCode::new(resource.to_string()), action.parse()?))
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
