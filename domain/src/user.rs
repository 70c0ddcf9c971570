use crate::store::KeyedMutexStore;
use dashmap::DashMap;
use log::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque per-browser user identifier, assigned once through the identity cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out increasing user ids, starting at 1.
#[derive(Debug, Default)]
pub struct UserIdAllocator {
    last: AtomicU64,
}

impl UserIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> UserId {
        UserId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Maps each user to their one store.
///
/// Users are created lazily and never removed, so the registry grows with
/// the number of distinct visitors over the life of the process.
#[derive(Debug, Default)]
pub struct UserRegistry {
    stores: DashMap<UserId, Arc<KeyedMutexStore>>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the user's store, creating an empty one on first access.
    /// The shard lock is held across the check and the insert, so racing
    /// callers for the same id all get the same instance.
    pub fn get_or_create(&self, user_id: UserId) -> Arc<KeyedMutexStore> {
        let store = self.stores.entry(user_id).or_insert_with(|| {
            debug!("Creating store for new user {user_id}");
            Arc::new(KeyedMutexStore::new())
        });
        Arc::clone(store.value())
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_returns_the_same_instance() {
        let registry = UserRegistry::new();
        let first = registry.get_or_create(UserId(1));
        first.put([("count", 3)]).unwrap();

        let second = registry.get_or_create(UserId(1));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.get::<i64>("count").unwrap(), 3);
    }

    #[test]
    fn different_users_get_isolated_stores() {
        let registry = UserRegistry::new();
        registry.get_or_create(UserId(1)).put([("count", 3)]).unwrap();

        let other = registry.get_or_create(UserId(2));
        assert!(other.get::<i64>("count").unwrap_err().is_key_not_found());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn concurrent_get_or_create_creates_exactly_one_store() {
        let registry = Arc::new(UserRegistry::new());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get_or_create(UserId(42)))
            })
            .collect();

        let stores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(stores.iter().all(|s| Arc::ptr_eq(s, &stores[0])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn allocator_is_monotonic_from_one() {
        let allocator = UserIdAllocator::new();
        assert_eq!(allocator.next_id(), UserId(1));
        assert_eq!(allocator.next_id(), UserId(2));
        assert_eq!(allocator.next_id(), UserId(3));
    }
}
