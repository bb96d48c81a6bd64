//! Merkle-Patricia trie used for transient root computation and proof
//! verification.
//!
//! The host builds short-lived tries for the `ext_trie_*` root calls and for
//! storage root computation; the proof verifier reconstructs a partial trie
//! from encoded nodes. Insertion and lookup work on materialised nodes;
//! children known only by Merkle value (from a partial proof) simply resolve
//! to "absent" on lookup.

use codec::{Compact, Encode};

use crate::hashing::blake2_256;
use crate::Hash;

pub mod nibbles;
pub mod node;
pub mod proof;

pub use node::{merkle_value, Child, Node, NodeError};

use nibbles::{bytes_to_nibbles, common_prefix_len};

/// An in-memory Merkle-Patricia trie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trie {
    root: Option<Node>,
}

impl Trie {
    /// An empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// A trie rooted at an already-built node (proof reconstruction).
    pub fn from_root(root: Node) -> Self {
        Self { root: Some(root) }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Insert a key/value pair, replacing any existing value.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) {
        let nibbles = bytes_to_nibbles(key);
        let root = self.root.take();
        self.root = Some(match root {
            None => Node::Leaf {
                partial_key: nibbles,
                value: value.to_vec(),
            },
            Some(node) => insert_node(node, &nibbles, value.to_vec()),
        });
    }

    /// Look up a key.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let nibbles = bytes_to_nibbles(key);
        get_node(self.root.as_ref()?, &nibbles)
    }

    /// The blake2b-256 Merkle root. The empty trie hashes the empty-node
    /// encoding `[0x00]`.
    pub fn root_hash(&self) -> Hash {
        match &self.root {
            None => blake2_256(&[0x00]),
            Some(node) => blake2_256(&node.encode()),
        }
    }

    /// Wire encodings of every materialised node, root first.
    ///
    /// The full node set of a trie is a valid (if maximal) Merkle proof for
    /// any of its keys, since proof verification tolerates unreachable
    /// extras.
    pub fn node_encodings(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            collect_encodings(root, &mut out);
        }
        out
    }

    /// Build a trie from `(key, value)` pairs.
    pub fn from_pairs<K: AsRef<[u8]>, V: AsRef<[u8]>>(pairs: &[(K, V)]) -> Self {
        let mut trie = Self::new();
        for (key, value) in pairs {
            trie.insert(key.as_ref(), value.as_ref());
        }
        trie
    }

    /// Build a trie keyed by the compact encoding of each value's index.
    pub fn from_ordered_values<V: AsRef<[u8]>>(values: &[V]) -> Self {
        let mut trie = Self::new();
        for (i, value) in values.iter().enumerate() {
            trie.insert(&Compact(i as u32).encode(), value.as_ref());
        }
        trie
    }
}

fn collect_encodings(node: &Node, out: &mut Vec<Vec<u8>>) {
    out.push(node.encode());
    if let Node::Branch { children, .. } = node {
        for child in children.iter().flatten() {
            if let Child::Node(child) = child {
                collect_encodings(child, out);
            }
        }
    }
}

fn empty_children() -> Box<[Option<Child>; 16]> {
    Box::new(Default::default())
}

fn insert_node(node: Node, key: &[u8], value: Vec<u8>) -> Node {
    match node {
        Node::Leaf {
            partial_key,
            value: old_value,
        } => {
            let common = common_prefix_len(&partial_key, key);
            if common == partial_key.len() && common == key.len() {
                return Node::Leaf {
                    partial_key,
                    value,
                };
            }

            // The leaf and the new key diverge: split into a branch at the
            // common prefix.
            let mut children = empty_children();
            let mut branch_value = None;

            if common == partial_key.len() {
                branch_value = Some(old_value);
            } else {
                let index = partial_key[common] as usize;
                children[index] = Some(Child::Node(Box::new(Node::Leaf {
                    partial_key: partial_key[common + 1..].to_vec(),
                    value: old_value,
                })));
            }

            if common == key.len() {
                branch_value = Some(value);
            } else {
                let index = key[common] as usize;
                children[index] = Some(Child::Node(Box::new(Node::Leaf {
                    partial_key: key[common + 1..].to_vec(),
                    value,
                })));
            }

            Node::Branch {
                partial_key: key[..common].to_vec(),
                value: branch_value,
                children,
            }
        }
        Node::Branch {
            partial_key,
            value: branch_value,
            mut children,
        } => {
            let common = common_prefix_len(&partial_key, key);
            if common == partial_key.len() {
                if key.len() == common {
                    return Node::Branch {
                        partial_key,
                        value: Some(value),
                        children,
                    };
                }
                let index = key[common] as usize;
                let rest = &key[common + 1..];
                let slot = children[index].take();
                children[index] = Some(match slot {
                    None => Child::Node(Box::new(Node::Leaf {
                        partial_key: rest.to_vec(),
                        value,
                    })),
                    Some(Child::Node(child)) => {
                        Child::Node(Box::new(insert_node(*child, rest, value)))
                    }
                    // Unreachable for tries built by insertion; a partial
                    // proof trie overwrites the unresolved reference.
                    Some(Child::Hash(_)) => Child::Node(Box::new(Node::Leaf {
                        partial_key: rest.to_vec(),
                        value,
                    })),
                });
                return Node::Branch {
                    partial_key,
                    value: branch_value,
                    children,
                };
            }

            // The branch itself diverges: insert an intermediate branch.
            let mut new_children = empty_children();
            let old_index = partial_key[common] as usize;
            new_children[old_index] = Some(Child::Node(Box::new(Node::Branch {
                partial_key: partial_key[common + 1..].to_vec(),
                value: branch_value,
                children,
            })));

            let mut new_value = None;
            if common == key.len() {
                new_value = Some(value);
            } else {
                let index = key[common] as usize;
                new_children[index] = Some(Child::Node(Box::new(Node::Leaf {
                    partial_key: key[common + 1..].to_vec(),
                    value,
                })));
            }

            Node::Branch {
                partial_key: key[..common].to_vec(),
                value: new_value,
                children: new_children,
            }
        }
    }
}

fn get_node(node: &Node, key: &[u8]) -> Option<Vec<u8>> {
    match node {
        Node::Leaf { partial_key, value } => {
            (partial_key.as_slice() == key).then(|| value.clone())
        }
        Node::Branch {
            partial_key,
            value,
            children,
        } => {
            if key.len() < partial_key.len() || !key.starts_with(partial_key) {
                return None;
            }
            if key.len() == partial_key.len() {
                return value.clone();
            }
            let index = key[partial_key.len()] as usize;
            match children[index].as_ref()? {
                Child::Node(child) => get_node(child, &key[partial_key.len() + 1..]),
                // Referenced but not materialised: unknown to this partial trie.
                Child::Hash(_) => None,
            }
        }
    }
}
