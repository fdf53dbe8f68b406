//! Effective-state resolution: deny wins, grant second, silence omitted.
//!
//! - No IO
//! - No panics
//! - No role priority — effect value alone decides the outcome

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::policy::{Effect, PermissionKey, PolicyGrant};

/// Resolve a flat list of policy tuples into the effective permission map.
///
/// For each `resource:action` key: any deny resolves to `Deny` regardless
/// of how many grants exist; otherwise any grant resolves to `Grant`; keys
/// with no contribution are absent (no opinion). Order-independent and
/// idempotent, so snapshots rebuilt from the same inputs are identical.
pub fn resolve_effects<I>(grants: I) -> BTreeMap<PermissionKey, Effect>
where
    I: IntoIterator<Item = PolicyGrant>,
{
    let mut resolved: BTreeMap<PermissionKey, Effect> = BTreeMap::new();

    for grant in grants {
        match resolved.entry(grant.key()) {
            Entry::Vacant(slot) => {
                slot.insert(grant.effect);
            }
            Entry::Occupied(mut slot) => {
                // Deny is absorbing; a grant never overrides it.
                if grant.effect == Effect::Deny {
                    slot.insert(Effect::Deny);
                }
            }
        }
    }

    resolved
}
