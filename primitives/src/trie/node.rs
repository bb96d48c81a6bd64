//! Trie node representation and wire codec.
//!
//! Node encoding:
//!
//! ```text
//! header byte: vv pppppp     vv = 01 leaf, 10 branch, 11 branch-with-value
//!                            pppppp = partial key nibble count, 0x3F starts
//!                            a continuation byte sequence
//! partial key: padded nibble bytes
//! branch only: children bitmap, u16 little-endian, bit i = child i present
//! value:       SCALE bytes (leaf always, branch when the variant says so)
//! children:    SCALE bytes of each present child's Merkle value, in order
//! ```
//!
//! The Merkle value of a non-root node is its encoding when that encoding is
//! at most 32 bytes, otherwise the blake2b-256 digest of the encoding. The
//! root's Merkle value is always the digest.

use codec::{Decode, Encode};

use crate::hashing::blake2_256;
use crate::trie::nibbles;

const VARIANT_MASK: u8 = 0b1100_0000;
const VARIANT_LEAF: u8 = 0b0100_0000;
const VARIANT_BRANCH: u8 = 0b1000_0000;
const VARIANT_BRANCH_WITH_VALUE: u8 = 0b1100_0000;
const PARTIAL_KEY_LEN_MASK: u8 = 0b0011_1111;

/// Reference from a branch to one of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    /// The child's advertised Merkle value, as decoded from the wire.
    Hash(Vec<u8>),
    /// A fully materialised child node.
    Node(Box<Node>),
}

/// An in-memory trie node. Partial keys are nibble slices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf {
        partial_key: Vec<u8>,
        value: Vec<u8>,
    },
    Branch {
        partial_key: Vec<u8>,
        value: Option<Vec<u8>>,
        children: Box<[Option<Child>; 16]>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("unexpected end of node data")]
    UnexpectedEof,
    #[error("unknown node variant byte {0:#04x}")]
    UnknownVariant(u8),
    #[error("invalid scale payload: {0}")]
    Scale(String),
}

impl Node {
    /// Encode the node to its wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Node::Leaf { partial_key, value } => {
                encode_header(&mut out, VARIANT_LEAF, partial_key.len());
                out.extend_from_slice(&nibbles::nibbles_to_padded_bytes(partial_key));
                value.encode_to(&mut out);
            }
            Node::Branch {
                partial_key,
                value,
                children,
            } => {
                let variant = if value.is_some() {
                    VARIANT_BRANCH_WITH_VALUE
                } else {
                    VARIANT_BRANCH
                };
                encode_header(&mut out, variant, partial_key.len());
                out.extend_from_slice(&nibbles::nibbles_to_padded_bytes(partial_key));

                let mut bitmap = 0u16;
                for (i, child) in children.iter().enumerate() {
                    if child.is_some() {
                        bitmap |= 1 << i;
                    }
                }
                out.extend_from_slice(&bitmap.to_le_bytes());

                if let Some(value) = value {
                    value.encode_to(&mut out);
                }
                for child in children.iter().flatten() {
                    child.merkle_value().encode_to(&mut out);
                }
            }
        }
        out
    }

    /// Decode a node from its wire form.
    pub fn decode(encoded: &[u8]) -> Result<Self, NodeError> {
        let input = &mut &encoded[..];
        let header = read_byte(input)?;
        let variant = header & VARIANT_MASK;

        let mut partial_key_len = (header & PARTIAL_KEY_LEN_MASK) as usize;
        if partial_key_len == PARTIAL_KEY_LEN_MASK as usize {
            loop {
                let byte = read_byte(input)?;
                partial_key_len += byte as usize;
                if byte < 255 {
                    break;
                }
            }
        }

        let packed_len = partial_key_len / 2 + partial_key_len % 2;
        if input.len() < packed_len {
            return Err(NodeError::UnexpectedEof);
        }
        let partial_key = nibbles::padded_bytes_to_nibbles(&input[..packed_len], partial_key_len);
        *input = &input[packed_len..];

        match variant {
            VARIANT_LEAF => {
                let value = decode_scale_bytes(input)?;
                Ok(Node::Leaf { partial_key, value })
            }
            VARIANT_BRANCH | VARIANT_BRANCH_WITH_VALUE => {
                if input.len() < 2 {
                    return Err(NodeError::UnexpectedEof);
                }
                let bitmap = u16::from_le_bytes([input[0], input[1]]);
                *input = &input[2..];

                let value = if variant == VARIANT_BRANCH_WITH_VALUE {
                    Some(decode_scale_bytes(input)?)
                } else {
                    None
                };

                let mut children: [Option<Child>; 16] = Default::default();
                for (i, slot) in children.iter_mut().enumerate() {
                    if bitmap & (1 << i) != 0 {
                        *slot = Some(Child::Hash(decode_scale_bytes(input)?));
                    }
                }
                Ok(Node::Branch {
                    partial_key,
                    value,
                    children: Box::new(children),
                })
            }
            _ => Err(NodeError::UnknownVariant(header)),
        }
    }

    /// Merkle value of this node in non-root position.
    pub fn merkle_value(&self) -> Vec<u8> {
        merkle_value(&self.encode(), false)
    }
}

impl Child {
    fn merkle_value(&self) -> Vec<u8> {
        match self {
            Child::Hash(hash) => hash.clone(),
            Child::Node(node) => node.merkle_value(),
        }
    }
}

/// Merkle value of an encoded node: the encoding itself when it fits in 32
/// bytes and the node is not the root, the blake2b-256 digest otherwise.
pub fn merkle_value(encoding: &[u8], is_root: bool) -> Vec<u8> {
    if !is_root && encoding.len() <= 32 {
        encoding.to_vec()
    } else {
        blake2_256(encoding).to_vec()
    }
}

fn encode_header(out: &mut Vec<u8>, variant: u8, partial_key_len: usize) {
    if partial_key_len < PARTIAL_KEY_LEN_MASK as usize {
        out.push(variant | partial_key_len as u8);
        return;
    }
    out.push(variant | PARTIAL_KEY_LEN_MASK);
    let mut remaining = partial_key_len - PARTIAL_KEY_LEN_MASK as usize;
    while remaining >= 255 {
        out.push(255);
        remaining -= 255;
    }
    out.push(remaining as u8);
}

fn read_byte(input: &mut &[u8]) -> Result<u8, NodeError> {
    let (&first, rest) = input.split_first().ok_or(NodeError::UnexpectedEof)?;
    *input = rest;
    Ok(first)
}

fn decode_scale_bytes(input: &mut &[u8]) -> Result<Vec<u8>, NodeError> {
    Vec::<u8>::decode(input).map_err(|e| NodeError::Scale(e.to_string()))
}
