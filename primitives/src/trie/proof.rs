//! Merkle proof verification.
//!
//! A proof is an unordered set of encoded trie nodes. Verification
//! reconstructs a partial trie: every node is indexed by its non-root Merkle
//! value, the root is found by comparing forced blake2b digests against the
//! expected root hash, and branch children are spliced in recursively by
//! their advertised Merkle value. Nodes unreachable from the root are
//! tolerated.

use std::collections::HashMap;

use codec::Decode;

use crate::trie::node::{merkle_value, Child, Node, NodeError};
use crate::trie::Trie;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("proof slice empty")]
    EmptyProof,
    #[error("cannot decode proof node at index {index}: {source}")]
    DecodeNode { index: usize, source: NodeError },
    #[error("root node not found in proof")]
    RootNotFound,
    #[error("key not found in proof trie")]
    KeyNotFound,
    #[error("value in proof trie does not match expected value")]
    ValueMismatch,
    #[error("cannot decode proof node list: {0}")]
    InvalidEncoding(String),
}

/// Verify that `key` belongs to the trie with the given root, using the
/// encoded proof nodes. When `expected_value` is non-empty, the value found
/// in the proof trie must match it byte for byte.
pub fn verify(
    encoded_proof_nodes: &[Vec<u8>],
    root_hash: &[u8],
    key: &[u8],
    expected_value: &[u8],
) -> Result<(), ProofError> {
    let trie = build_trie(encoded_proof_nodes, root_hash)?;

    let value = trie.get(key).ok_or(ProofError::KeyNotFound)?;
    if !expected_value.is_empty() && value != expected_value {
        return Err(ProofError::ValueMismatch);
    }
    Ok(())
}

/// Decode a SCALE-encoded proof span (`Vec<Vec<u8>>`) and verify it.
pub fn verify_encoded(
    proof: &[u8],
    root_hash: &[u8],
    key: &[u8],
    expected_value: &[u8],
) -> Result<(), ProofError> {
    let nodes = Vec::<Vec<u8>>::decode(&mut &proof[..])
        .map_err(|e| ProofError::InvalidEncoding(e.to_string()))?;
    verify(&nodes, root_hash, key, expected_value)
}

/// Reconstruct a partial trie from the proof node set.
fn build_trie(encoded_proof_nodes: &[Vec<u8>], root_hash: &[u8]) -> Result<Trie, ProofError> {
    if encoded_proof_nodes.is_empty() {
        return Err(ProofError::EmptyProof);
    }

    let mut proof_hash_to_node: HashMap<String, Node> =
        HashMap::with_capacity(encoded_proof_nodes.len());
    let mut root: Option<Node> = None;

    for (index, encoded) in encoded_proof_nodes.iter().enumerate() {
        let node =
            Node::decode(encoded).map_err(|source| ProofError::DecodeNode { index, source })?;

        // Index by the non-root Merkle value: inline children reference
        // their encoding directly, hashed children their digest.
        let node_merkle_value = merkle_value(encoded, false);
        proof_hash_to_node.insert(hex::encode(&node_merkle_value), node.clone());

        if root.is_some() {
            continue;
        }

        // The root's Merkle value is always the digest, so small encodings
        // must be re-hashed before comparing with the expected root.
        let possible_root = if node_merkle_value.len() <= 32 {
            merkle_value(encoded, true)
        } else {
            node_merkle_value
        };
        if possible_root == root_hash {
            root = Some(node);
        }
    }

    let mut root = root.ok_or(ProofError::RootNotFound)?;
    load_children(&proof_hash_to_node, &mut root);
    Ok(Trie::from_root(root))
}

/// Replace advertised child hashes with the indexed nodes, recursively.
fn load_children(proof_hash_to_node: &HashMap<String, Node>, node: &mut Node) {
    let Node::Branch { children, .. } = node else {
        return;
    };
    for slot in children.iter_mut() {
        let resolved = match slot {
            Some(Child::Hash(hash)) => proof_hash_to_node.get(&hex::encode(&*hash)).cloned(),
            _ => None,
        };
        if let Some(mut child) = resolved {
            load_children(proof_hash_to_node, &mut child);
            *slot = Some(Child::Node(Box::new(child)));
        }
    }
}
