//! The storage collaborator interface.
//!
//! One instance-scoped object implements every storage operation the host
//! imports dispatch to: main-trie CRUD, child-trie variants, root hash
//! computation, and nestable transactions. Reads always observe earlier
//! writes from the same instance, including uncommitted transactional ones.

use filament_primitives::Hash;

/// Storage operations backing the `ext_storage_*` and
/// `ext_default_child_storage_*` imports.
pub trait Storage: Send {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>);
    fn delete(&mut self, key: &[u8]);

    /// The next key after `key` in byte-wise sorted order.
    fn next_key(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn clear_prefix(&mut self, prefix: &[u8]);

    /// Remove up to `limit` keys sharing `prefix`. Returns the number removed
    /// and whether no matching keys remain.
    fn clear_prefix_limit(&mut self, prefix: &[u8], limit: u32) -> (u32, bool);

    /// Merkle root of the main trie, child roots included.
    fn root(&self) -> Hash;

    fn exists(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    // Child storage. Each `child` key names an isolated sub-trie.

    fn child_get(&self, child: &[u8], key: &[u8]) -> Option<Vec<u8>>;
    fn child_put(&mut self, child: &[u8], key: Vec<u8>, value: Vec<u8>);
    fn child_delete(&mut self, child: &[u8], key: &[u8]);
    fn child_next_key(&self, child: &[u8], key: &[u8]) -> Option<Vec<u8>>;
    fn child_clear_prefix(&mut self, child: &[u8], prefix: &[u8]);

    /// Root of one child trie, `None` when the child does not exist.
    fn child_root(&self, child: &[u8]) -> Option<Hash>;

    /// Remove a whole child trie.
    fn delete_child(&mut self, child: &[u8]);

    /// Remove up to `limit` keys from a child trie (all of them for `None`).
    /// Returns the number removed and whether the child is now empty.
    fn delete_child_limit(&mut self, child: &[u8], limit: Option<u32>) -> (u32, bool);

    // Transactions. Calls outside any transaction commit immediately.

    fn begin_transaction(&mut self);
    fn commit_transaction(&mut self);
    fn rollback_transaction(&mut self);
}
