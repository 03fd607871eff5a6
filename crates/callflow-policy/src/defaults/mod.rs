//! In-memory implementations of the collaborator seams, for tests and
//! lightweight embedding.

mod in_memory_policy_store;
mod in_memory_subscriptions;

pub use in_memory_policy_store::InMemoryPolicyStore;
pub use in_memory_subscriptions::InMemorySubscriptionService;

use std::collections::HashSet;

use crate::traits::ExtensionDirectory;

/// Extension directory backed by a fixed taken-set. `allow_all` is the
/// common test fixture.
pub struct StaticExtensionDirectory {
    taken: HashSet<u32>,
}

impl StaticExtensionDirectory {
    pub fn allow_all() -> Self {
        Self {
            taken: HashSet::new(),
        }
    }

    pub fn with_taken(taken: impl IntoIterator<Item = u32>) -> Self {
        Self {
            taken: taken.into_iter().collect(),
        }
    }
}

impl ExtensionDirectory for StaticExtensionDirectory {
    fn is_extension_available(&self, extension: u32) -> bool {
        !self.taken.contains(&extension)
    }
}
