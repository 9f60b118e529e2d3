//! Object state cache.
//!
//! Holds the last snapshot observed for each object, keyed by
//! `[namespace/]resource/name`. Any number of watch loops may read and write
//! concurrently; access is serialized by a read/write lock.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::RwLock;
use serde_json::Value;

/// Last fully observed state of one object. Replaced wholesale on every write.
pub type Snapshot = Arc<Value>;

enum Entries {
    /// Entries live until an explicit delete.
    Unbounded(HashMap<String, Snapshot>),
    /// Least-recently-used entries are evicted once capacity is reached.
    Bounded(LruCache<String, Snapshot>),
}

/// Keyed store of the most recent snapshot per object
pub struct ObjectCache {
    entries: RwLock<Entries>,
}

impl ObjectCache {
    /// Cache without eviction.
    ///
    /// Objects that vanish without a delete notification (for example while
    /// the agent was down) stay cached for the life of the process.
    pub fn unbounded() -> Self {
        Self {
            entries: RwLock::new(Entries::Unbounded(HashMap::new())),
        }
    }

    /// Cache holding at most `capacity` snapshots, evicting the least
    /// recently read or written key first.
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(Entries::Bounded(LruCache::new(capacity))),
        }
    }

    /// Bounded when a capacity is given, unbounded otherwise.
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        match capacity {
            Some(capacity) => Self::bounded(capacity),
            None => Self::unbounded(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Snapshot> {
        {
            let entries = self.entries.read();
            if let Entries::Unbounded(map) = &*entries {
                return map.get(key).cloned();
            }
        }

        // LRU lookups update recency, so they need the write lock.
        let mut entries = self.entries.write();
        match &mut *entries {
            Entries::Unbounded(map) => map.get(key).cloned(),
            Entries::Bounded(lru) => lru.get(key).cloned(),
        }
    }

    /// Unconditionally replace the snapshot stored under `key`.
    ///
    /// Returns the key evicted to make room, if any.
    pub fn set(&self, key: impl Into<String>, snapshot: Value) -> Option<String> {
        let key = key.into();
        let snapshot = Arc::new(snapshot);
        let mut entries = self.entries.write();
        match &mut *entries {
            Entries::Unbounded(map) => {
                map.insert(key, snapshot);
                None
            }
            Entries::Bounded(lru) => match lru.push(key.clone(), snapshot) {
                // push hands back the old entry when the key was already present
                Some((evicted, _)) if evicted != key => Some(evicted),
                _ => None,
            },
        }
    }

    /// Remove `key`, returning whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        let mut entries = self.entries.write();
        match &mut *entries {
            Entries::Unbounded(map) => map.remove(key).is_some(),
            Entries::Bounded(lru) => lru.pop(key).is_some(),
        }
    }

    pub fn len(&self) -> usize {
        match &*self.entries.read() {
            Entries::Unbounded(map) => map.len(),
            Entries::Bounded(lru) => lru.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured bound, `None` for an unbounded cache
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        match &*self.entries.read() {
            Entries::Unbounded(_) => None,
            Entries::Bounded(lru) => Some(lru.cap()),
        }
    }
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
