// plc-logtrace - core/intern.rs
//
// Process-wide, thread-safe, write-once-per-key string interner for
// device_id/signal_name deduplication. Sharded to keep lock contention
// off the hot per-line parsing path: each key hashes to one of a fixed
// number of independently-locked buckets.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::sync::Arc;

use crate::core::model::Symbol;

const SHARD_COUNT: usize = 32;

type Shard = RwLock<HashMap<Box<str>, Symbol, BuildHasherDefault<ahash::AHasher>>>;

/// A sharded concurrent symbol table. Interning is best-effort: a symbol
/// may be briefly duplicated under racing first-insertions from two
/// shards, but never incorrectly shared across distinct content.
pub struct Interner {
    shards: Vec<Shard>,
}

impl Interner {
    pub fn new() -> Self {
        let shards = (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::default())).collect();
        Self { shards }
    }

    fn shard_for(&self, key: &str) -> &Shard {
        let mut hasher = ahash::AHasher::default();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Returns the interned `Symbol` for `key`, inserting it if absent.
    pub fn intern(&self, key: &str) -> Symbol {
        let shard = self.shard_for(key);
        if let Some(existing) = shard.read().get(key) {
            return Arc::clone(existing);
        }
        let mut guard = shard.write();
        if let Some(existing) = guard.get(key) {
            return Arc::clone(existing);
        }
        let sym: Symbol = Arc::from(key);
        guard.insert(Box::from(key), Arc::clone(&sym));
        sym
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_key_returns_identical_pointer() {
        let interner = Interner::new();
        let a = interner.intern("Robot-01");
        let b = interner.intern("Robot-01");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn interning_distinct_keys_does_not_alias() {
        let interner = Interner::new();
        let a = interner.intern("Robot-01");
        let b = interner.intern("Robot-02");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 2);
    }
}
