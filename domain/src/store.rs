use crate::error::{Error, Result, StoreErrorKind};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// One user's page state: string keys mapped to JSON-encoded values.
///
/// `put` holds the write lock for the whole batch, so readers never observe
/// half of a multi-key write. `get` takes the read lock and may run
/// alongside other reads. Entries live as long as the store itself.
#[derive(Debug, Default)]
pub struct KeyedMutexStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl KeyedMutexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode and store every entry.
    ///
    /// Entries are encoded one at a time. If one fails to encode the call
    /// returns that error, and the entries written before it in this call
    /// stay written; there is no rollback.
    pub fn put<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Serialize,
    {
        let mut data = self.data.write();
        for (key, value) in entries {
            let key = key.into();
            let bytes = serde_json::to_vec(&value)
                .map_err(|e| Error::store(StoreErrorKind::Encode, Some(e)))?;
            data.insert(key, bytes);
        }
        Ok(())
    }

    /// Decode the value stored under `key` into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let data = self.data.read();
        let bytes = data
            .get(key)
            .ok_or_else(|| Error::store(StoreErrorKind::KeyNotFound, None))?;
        serde_json::from_slice(bytes).map_err(|e| Error::store(StoreErrorKind::Decode, Some(e)))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind};
    use serde::{Deserialize, Serializer};
    use std::sync::Arc;

    #[test]
    fn get_returns_latest_put_for_each_key() {
        let store = KeyedMutexStore::new();
        store.put([("count", 1), ("step", 5)]).unwrap();
        store.put([("count", 2)]).unwrap();

        assert_eq!(store.get::<i64>("count").unwrap(), 2);
        assert_eq!(store.get::<i64>("step").unwrap(), 5);
    }

    #[test]
    fn get_of_unknown_key_is_key_not_found() {
        let store = KeyedMutexStore::new();
        let other = KeyedMutexStore::new();
        other.put([("count", 1)]).unwrap();

        let err = store.get::<i64>("count").unwrap_err();
        assert!(err.is_key_not_found());
    }

    #[test]
    fn get_with_wrong_shape_is_decode_error() {
        #[derive(Debug, Deserialize)]
        struct Todo {
            #[allow(dead_code)]
            title: String,
        }

        let store = KeyedMutexStore::new();
        store.put([("todo", "just a string")]).unwrap();

        let err = store.get::<Todo>("todo").unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Store(StoreErrorKind::Decode))
        );
    }

    enum Entry {
        Good(i64),
        Bad,
    }

    impl Serialize for Entry {
        fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
            match self {
                Entry::Good(n) => serializer.serialize_i64(*n),
                Entry::Bad => Err(serde::ser::Error::custom("cannot encode")),
            }
        }
    }

    #[test]
    fn failed_entry_keeps_earlier_entries_of_the_same_call() {
        let store = KeyedMutexStore::new();
        let err = store
            .put(vec![("a", Entry::Good(1)), ("b", Entry::Bad), ("c", Entry::Good(3))])
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Store(StoreErrorKind::Encode))
        );
        assert_eq!(store.get::<i64>("a").unwrap(), 1);
        assert!(!store.contains_key("b"));
        assert!(!store.contains_key("c"));
    }

    #[test]
    fn readers_never_see_half_of_a_batch() {
        let store = Arc::new(KeyedMutexStore::new());
        store.put([("left", 0), ("right", 0)]).unwrap();

        std::thread::scope(|scope| {
            let writer = Arc::clone(&store);
            scope.spawn(move || {
                for n in 1..=500 {
                    writer.put([("left", n), ("right", n)]).unwrap();
                }
            });

            for _ in 0..500 {
                let guard = store.data.read();
                let left: i64 = serde_json::from_slice(&guard["left"]).unwrap();
                let right: i64 = serde_json::from_slice(&guard["right"]).unwrap();
                assert_eq!(left, right);
            }
        });
    }
}
