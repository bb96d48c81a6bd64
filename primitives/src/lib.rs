//! `filament-primitives` — foundational types for the Filament runtime host.
//!
//! This crate provides the consensus-critical building blocks shared by the
//! host-function layer and the node services around it:
//!
//! - `codec` — SCALE envelope helpers for the Wasm marshalling ABI
//! - `hashing` — blake2b, keccak, sha2 and xxhash64 providers
//! - `crypto` — ed25519, sr25519 and secp256k1 ECDSA key handling
//! - `trie` — Merkle-Patricia trie, node codec and proof verification
//!
//! Everything here must be byte-identical with the other node
//! implementations: hash outputs, trie roots and encodings feed directly
//! into consensus.

pub mod codec;
pub mod crypto;
pub mod hashing;
pub mod trie;

/// A 32-byte hash. Blake2b-256 unless stated otherwise.
pub type Hash = [u8; 32];

/// A 4-byte tag naming a keystore within the host context (e.g. `b"babe"`).
pub type KeyTypeId = [u8; 4];
