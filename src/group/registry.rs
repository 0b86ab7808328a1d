//! Group Registry Module
//!
//! Process-wide `name -> Group` table with read-biased concurrent access.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::group::Group;

static GROUPS: OnceLock<RwLock<HashMap<String, Arc<Group>>>> = OnceLock::new();

fn table() -> &'static RwLock<HashMap<String, Arc<Group>>> {
    GROUPS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Inserts a group under its name, replacing any previous registration.
pub(crate) fn register(group: Arc<Group>) {
    table().write().insert(group.name().to_string(), group);
}

/// Returns the named group, or None if it has not been registered.
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    table().read().get(name).cloned()
}

/// Empties the registry. Test hook only; production code never unregisters.
#[doc(hidden)]
pub fn reset_registry() {
    table().write().clear();
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_group_is_none() {
        assert!(get_group("registry-test-no-such-group").is_none());
    }
}
