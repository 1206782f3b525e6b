/*!
 * In-Memory Store
 *
 * Two independent keyed containers — a flat string store and a nested
 * hash store — each behind its own multi-reader/single-writer lock.
 * Composite operations (e.g. "create the hash if absent, then set a
 * field") take one write-lock acquisition so they are atomic with
 * respect to other writers.
 */

use parking_lot::RwLock;
use std::collections::HashMap;

type Bytes = Vec<u8>;

#[derive(Default)]
pub struct Store {
    strings: RwLock<HashMap<Bytes, Bytes>>,
    hashes: RwLock<HashMap<Bytes, HashMap<Bytes, Bytes>>>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    // -- string store --

    /// Sets `key` to `value`, overwriting any prior value. Always succeeds.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.strings.write().insert(key, value);
    }

    /// Returns a copy of the value at `key`, or `None` if it isn't set.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.strings.read().get(key).cloned()
    }

    /// Removes `key`. Returns whether it was present.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.strings.write().remove(key).is_some()
    }

    /// Returns whether `key` is currently set.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.strings.read().contains_key(key)
    }

    // -- hash store --

    /// Sets a field, creating the hash if absent. Always succeeds.
    pub fn hset(&self, key: &[u8], field: &[u8], value: Bytes) {
        self.hashes
            .write()
            .entry(key.to_vec())
            .or_default()
            .insert(field.to_vec(), value);
    }

    /// Returns a copy of `field` within the hash at `key`, or `None` if
    /// either the hash or the field is absent.
    pub fn hget(&self, key: &[u8], field: &[u8]) -> Option<Bytes> {
        self.hashes.read().get(key).and_then(|h| h.get(field).cloned())
    }

    /// All field/value pairs in the hash, or `None` if the key is absent.
    pub fn hgetall(&self, key: &[u8]) -> Option<Vec<(Bytes, Bytes)>> {
        self.hashes.read().get(key).map(|h| {
            h.iter()
                .map(|(f, v)| (f.clone(), v.clone()))
                .collect()
        })
    }

    /// Removes `field` from the hash at `key`. Returns whether it was
    /// present; a missing hash is treated the same as a missing field.
    pub fn hdel(&self, key: &[u8], field: &[u8]) -> bool {
        let mut hashes = self.hashes.write();
        match hashes.get_mut(key) {
            Some(h) => h.remove(field).is_some(),
            None => false,
        }
    }

    /// Number of fields in the hash at `key`, or `0` if it doesn't exist.
    pub fn hlen(&self, key: &[u8]) -> i64 {
        self.hashes
            .read()
            .get(key)
            .map(|h| h.len() as i64)
            .unwrap_or(0)
    }

    /// All field names in the hash at `key`, or `None` if it's absent.
    pub fn hkeys(&self, key: &[u8]) -> Option<Vec<Bytes>> {
        self.hashes
            .read()
            .get(key)
            .map(|h| h.keys().cloned().collect())
    }

    /// All values in the hash at `key`, or `None` if it's absent.
    pub fn hvals(&self, key: &[u8]) -> Option<Vec<Bytes>> {
        self.hashes
            .read()
            .get(key)
            .map(|h| h.values().cloned().collect())
    }
}
