//! Default `Storage` implementation: a sorted in-memory overlay with a
//! snapshot stack for nested transactions.
//!
//! `BTreeMap` keeps iteration deterministic, which `next_key`, prefix
//! clearing and root computation all rely on. `begin_transaction` pushes a
//! snapshot of the whole state; `rollback_transaction` restores it and
//! `commit_transaction` discards it, which makes the top of the stack merge
//! into its parent by construction.

use std::collections::BTreeMap;

use filament_primitives::trie::Trie;
use filament_primitives::Hash;

use crate::storage::Storage;

/// Main-trie key prefix under which child roots surface.
const CHILD_STORAGE_PREFIX: &[u8] = b":child_storage:default:";

type KvMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory transactional trie state.
#[derive(Debug, Clone, Default)]
pub struct TrieState {
    main: KvMap,
    children: BTreeMap<Vec<u8>, KvMap>,
    snapshots: Vec<(KvMap, BTreeMap<Vec<u8>, KvMap>)>,
}

impl TrieState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the main trie from `(key, value)` pairs.
    pub fn with_entries<K: AsRef<[u8]>, V: AsRef<[u8]>>(entries: &[(K, V)]) -> Self {
        let mut state = Self::new();
        for (key, value) in entries {
            state.main.insert(key.as_ref().to_vec(), value.as_ref().to_vec());
        }
        state
    }

    /// Current transaction nesting depth.
    pub fn transaction_depth(&self) -> usize {
        self.snapshots.len()
    }

    fn clear_prefix_in(map: &mut KvMap, prefix: &[u8], limit: Option<u32>) -> (u32, bool) {
        let matching: Vec<Vec<u8>> = map
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();

        let take = match limit {
            Some(limit) => (limit as usize).min(matching.len()),
            None => matching.len(),
        };
        for key in &matching[..take] {
            map.remove(key);
        }

        let removed = take as u32;
        // A zero limit never reports completion, even over an empty range.
        let all_removed = take == matching.len() && limit != Some(0);
        (removed, all_removed)
    }
}

impl Storage for TrieState {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.main.get(key).cloned()
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.main.insert(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.main.remove(key);
    }

    fn next_key(&self, key: &[u8]) -> Option<Vec<u8>> {
        use std::ops::Bound;
        self.main
            .range((Bound::Excluded(key.to_vec()), Bound::Unbounded))
            .next()
            .map(|(k, _)| k.clone())
    }

    fn clear_prefix(&mut self, prefix: &[u8]) {
        Self::clear_prefix_in(&mut self.main, prefix, None);
    }

    fn clear_prefix_limit(&mut self, prefix: &[u8], limit: u32) -> (u32, bool) {
        Self::clear_prefix_in(&mut self.main, prefix, Some(limit))
    }

    fn root(&self) -> Hash {
        let mut trie = Trie::new();
        for (key, value) in &self.main {
            trie.insert(key, value);
        }
        for (child, entries) in &self.children {
            if entries.is_empty() {
                continue;
            }
            let mut child_trie = Trie::new();
            for (key, value) in entries {
                child_trie.insert(key, value);
            }
            let mut child_key = CHILD_STORAGE_PREFIX.to_vec();
            child_key.extend_from_slice(child);
            trie.insert(&child_key, &child_trie.root_hash());
        }
        trie.root_hash()
    }

    fn child_get(&self, child: &[u8], key: &[u8]) -> Option<Vec<u8>> {
        self.children.get(child)?.get(key).cloned()
    }

    fn child_put(&mut self, child: &[u8], key: Vec<u8>, value: Vec<u8>) {
        self.children
            .entry(child.to_vec())
            .or_default()
            .insert(key, value);
    }

    fn child_delete(&mut self, child: &[u8], key: &[u8]) {
        if let Some(entries) = self.children.get_mut(child) {
            entries.remove(key);
        }
    }

    fn child_next_key(&self, child: &[u8], key: &[u8]) -> Option<Vec<u8>> {
        use std::ops::Bound;
        self.children
            .get(child)?
            .range((Bound::Excluded(key.to_vec()), Bound::Unbounded))
            .next()
            .map(|(k, _)| k.clone())
    }

    fn child_clear_prefix(&mut self, child: &[u8], prefix: &[u8]) {
        if let Some(entries) = self.children.get_mut(child) {
            Self::clear_prefix_in(entries, prefix, None);
        }
    }

    fn child_root(&self, child: &[u8]) -> Option<Hash> {
        let entries = self.children.get(child)?;
        let mut trie = Trie::new();
        for (key, value) in entries {
            trie.insert(key, value);
        }
        Some(trie.root_hash())
    }

    fn delete_child(&mut self, child: &[u8]) {
        self.children.remove(child);
    }

    fn delete_child_limit(&mut self, child: &[u8], limit: Option<u32>) -> (u32, bool) {
        let Some(entries) = self.children.get_mut(child) else {
            return (0, true);
        };
        let (removed, all_removed) = Self::clear_prefix_in(entries, &[], limit);
        if entries.is_empty() {
            self.children.remove(child);
        }
        (removed, all_removed)
    }

    fn begin_transaction(&mut self) {
        self.snapshots.push((self.main.clone(), self.children.clone()));
    }

    fn commit_transaction(&mut self) {
        if self.snapshots.pop().is_none() {
            log::warn!(target: "storage", "commit_transaction without an open transaction");
        }
    }

    fn rollback_transaction(&mut self) {
        match self.snapshots.pop() {
            Some((main, children)) => {
                self.main = main;
                self.children = children;
            }
            None => log::warn!(target: "storage", "rollback_transaction without an open transaction"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let mut state = TrieState::new();
        state.put(b"k".to_vec(), b"v".to_vec());
        assert_eq!(state.get(b"k"), Some(b"v".to_vec()));
        assert!(state.exists(b"k"));
        state.delete(b"k");
        assert_eq!(state.get(b"k"), None);
    }

    #[test]
    fn test_next_key_is_strict_successor() {
        let state = TrieState::with_entries(&[(b"aa", b"1"), (b"ab", b"2"), (b"ba", b"3")]);
        assert_eq!(state.next_key(b"aa"), Some(b"ab".to_vec()));
        assert_eq!(state.next_key(b"ab"), Some(b"ba".to_vec()));
        assert_eq!(state.next_key(b"ba"), None);
        // A key between entries still finds the successor.
        assert_eq!(state.next_key(b"a"), Some(b"aa".to_vec()));
    }

    #[test]
    fn test_clear_prefix_limit() {
        let mut state = TrieState::with_entries(&[
            (b"aaa", b"1"),
            (b"aab", b"2"),
            (b"aba", b"3"),
            (b"bbb", b"4"),
        ]);
        let (removed, all) = state.clear_prefix_limit(b"aa", 1);
        assert_eq!((removed, all), (1, false));
        let (removed, all) = state.clear_prefix_limit(b"aa", 5);
        assert_eq!((removed, all), (1, true));
        assert_eq!(state.get(b"aba"), Some(b"3".to_vec()));
        assert_eq!(state.get(b"bbb"), Some(b"4".to_vec()));
    }

    #[test]
    fn test_clear_prefix_limit_zero_removes_nothing() {
        let mut state = TrieState::with_entries(&[(b"aa", b"1")]);
        assert_eq!(state.clear_prefix_limit(b"aa", 0), (0, false));
        assert_eq!(state.get(b"aa"), Some(b"1".to_vec()));
    }

    #[test]
    fn test_rollback_restores_exact_state() {
        let mut state = TrieState::with_entries(&[(b"k1", b"v1")]);
        let root_before = state.root();

        state.begin_transaction();
        state.put(b"k1".to_vec(), b"v2".to_vec());
        state.put(b"k2".to_vec(), b"v3".to_vec());
        state.rollback_transaction();

        assert_eq!(state.get(b"k1"), Some(b"v1".to_vec()));
        assert_eq!(state.get(b"k2"), None);
        assert_eq!(state.root(), root_before);
    }

    #[test]
    fn test_nested_transactions() {
        let mut state = TrieState::new();
        state.put(b"a".to_vec(), b"0".to_vec());

        state.begin_transaction();
        state.put(b"a".to_vec(), b"1".to_vec());

        state.begin_transaction();
        state.put(b"a".to_vec(), b"2".to_vec());
        assert_eq!(state.transaction_depth(), 2);
        state.rollback_transaction();

        // The inner rollback restores the outer transaction's view.
        assert_eq!(state.get(b"a"), Some(b"1".to_vec()));
        state.commit_transaction();
        assert_eq!(state.get(b"a"), Some(b"1".to_vec()));
        assert_eq!(state.transaction_depth(), 0);
    }

    #[test]
    fn test_reads_observe_uncommitted_writes() {
        let mut state = TrieState::new();
        state.begin_transaction();
        state.put(b"k".to_vec(), b"v".to_vec());
        assert_eq!(state.get(b"k"), Some(b"v".to_vec()));
    }

    #[test]
    fn test_child_storage_is_isolated() {
        let mut state = TrieState::new();
        state.child_put(b"c1", b"k".to_vec(), b"1".to_vec());
        state.child_put(b"c2", b"k".to_vec(), b"2".to_vec());

        assert_eq!(state.child_get(b"c1", b"k"), Some(b"1".to_vec()));
        assert_eq!(state.child_get(b"c2", b"k"), Some(b"2".to_vec()));
        assert_eq!(state.get(b"k"), None);

        state.child_delete(b"c1", b"k");
        assert_eq!(state.child_get(b"c1", b"k"), None);
        assert_eq!(state.child_get(b"c2", b"k"), Some(b"2".to_vec()));
    }

    #[test]
    fn test_delete_child_limit() {
        let mut state = TrieState::new();
        for i in 0u8..10 {
            state.child_put(b"c", vec![i], vec![i]);
        }
        assert_eq!(state.delete_child_limit(b"c", Some(3)), (3, false));
        assert_eq!(state.delete_child_limit(b"c", None), (7, true));
        // The emptied child is gone entirely.
        assert_eq!(state.child_root(b"c"), None);
    }

    #[test]
    fn test_child_roots_surface_in_main_root() {
        let mut state = TrieState::new();
        let plain_root = state.root();
        state.child_put(b"c", b"k".to_vec(), b"v".to_vec());
        assert_ne!(state.root(), plain_root);

        // The child root lands under the child-storage prefix.
        let child_root = state.child_root(b"c").unwrap();
        let mut probe = TrieState::new();
        let mut key = CHILD_STORAGE_PREFIX.to_vec();
        key.extend_from_slice(b"c");
        probe.put(key, child_root.to_vec());
        assert_eq!(probe.root(), state.root());
    }

    #[test]
    fn test_commit_outermost_keeps_changes() {
        let mut state = TrieState::new();
        state.begin_transaction();
        state.put(b"k".to_vec(), b"v".to_vec());
        state.commit_transaction();
        assert_eq!(state.get(b"k"), Some(b"v".to_vec()));
    }
}
