//! Keyspace Module
//!
//! The in-memory key-value mapping that serving requests read and write.
//!
//! ## Concurrency Model
//! A single `RwLock<HashMap>`: many concurrent readers, exclusive writers.
//! The keyspace keeps no history of its own; the transaction log is the only
//! source of history, and replaying it rebuilds this map after a restart.

use std::collections::HashMap;

use parking_lot::RwLock;

/// In-memory mapping from string keys to string values
#[derive(Debug, Default)]
pub struct Keyspace {
    entries: RwLock<HashMap<String, String>>,
}

impl Keyspace {
    /// Create an empty keyspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key (read lock)
    ///
    /// Returns `None` when the key was never written or has been deleted.
    /// A miss is a normal outcome, not an error.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Insert or overwrite a key (write lock)
    pub fn put(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    /// Remove a key (write lock)
    ///
    /// Deleting an absent key is a no-op.
    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the keyspace holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
