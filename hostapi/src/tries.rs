//! Thread-safe cache of state tries keyed by root hash.
//!
//! Serves root → trie lookups for the RPC and sync layers. Many readers may
//! proceed concurrently; insertion and removal take the writer lock, and the
//! gauge is updated under that same lock so its value always matches the
//! map size.

use std::collections::HashMap;

use parking_lot::RwLock;
use prometheus::IntGauge;

use filament_primitives::trie::Trie;
use filament_primitives::Hash;

/// Shared root-hash → trie cache.
pub struct Tries {
    root_to_trie: RwLock<HashMap<Hash, Trie>>,
    gauge: IntGauge,
}

impl Default for Tries {
    fn default() -> Self {
        Self::new()
    }
}

impl Tries {
    pub fn new() -> Self {
        let gauge = IntGauge::new(
            "tries_cached_total",
            "total number of tries cached in memory",
        )
        .expect("gauge name and help are static and valid; qed");
        // Registration only feeds the scrape endpoint; a second cache in the
        // same process keeps its own gauge unregistered.
        if let Err(err) = prometheus::default_registry().register(Box::new(gauge.clone())) {
            log::debug!(target: "state", "tries gauge not registered: {err}");
        }
        Self {
            root_to_trie: RwLock::new(HashMap::new()),
            gauge,
        }
    }

    /// Seed the cache with an initial trie.
    pub fn with_trie(trie: Trie) -> Self {
        let tries = Self::new();
        tries.soft_set(trie.root_hash(), trie);
        tries
    }

    /// Insert only if no trie is cached for this root yet.
    pub fn soft_set(&self, root: Hash, trie: Trie) {
        let mut map = self.root_to_trie.write();
        if map.contains_key(&root) {
            return;
        }
        self.gauge.inc();
        map.insert(root, trie);
    }

    pub fn delete(&self, root: Hash) {
        let mut map = self.root_to_trie.write();
        map.remove(&root);
        // Set instead of decrement, in case nothing existed at this root.
        self.gauge.set(map.len() as i64);
    }

    pub fn get(&self, root: &Hash) -> Option<Trie> {
        self.root_to_trie.read().get(root).cloned()
    }

    pub fn len(&self) -> usize {
        self.root_to_trie.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.root_to_trie.read().is_empty()
    }

    /// Current gauge reading.
    pub fn gauge_value(&self) -> i64 {
        self.gauge.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn trie_with(key: &[u8], value: &[u8]) -> Trie {
        let mut trie = Trie::new();
        trie.insert(key, value);
        trie
    }

    #[test]
    fn test_soft_set_keeps_first_insert() {
        let tries = Tries::new();
        let first = trie_with(b"a", b"1");
        let second = trie_with(b"b", b"2");
        let root = first.root_hash();

        tries.soft_set(root, first.clone());
        tries.soft_set(root, second);

        assert_eq!(tries.get(&root), Some(first));
        assert_eq!(tries.len(), 1);
        assert_eq!(tries.gauge_value(), 1);
    }

    #[test]
    fn test_delete_resets_gauge_to_length() {
        let tries = Tries::new();
        let trie = trie_with(b"a", b"1");
        let root = trie.root_hash();
        tries.soft_set(root, trie);

        tries.delete(root);
        assert_eq!(tries.len(), 0);
        assert_eq!(tries.gauge_value(), 0);

        // Deleting an absent root must not drive the gauge negative.
        tries.delete([0xEE; 32]);
        assert_eq!(tries.gauge_value(), 0);
    }

    #[test]
    fn test_get_missing_root() {
        let tries = Tries::new();
        assert_eq!(tries.get(&[0u8; 32]), None);
    }

    #[test]
    fn test_with_trie_seeds_cache() {
        let trie = trie_with(b"a", b"1");
        let root = trie.root_hash();
        let tries = Tries::with_trie(trie);
        assert!(tries.get(&root).is_some());
        assert_eq!(tries.len(), 1);
    }

    #[test]
    fn test_concurrent_soft_set_same_root_inserts_once() {
        let tries = Arc::new(Tries::new());
        let trie = trie_with(b"a", b"1");
        let root = trie.root_hash();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tries = Arc::clone(&tries);
                let trie = trie.clone();
                std::thread::spawn(move || tries.soft_set(root, trie))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tries.len(), 1);
        assert_eq!(tries.gauge_value(), 1);
    }
}
