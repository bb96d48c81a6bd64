//! Hashing providers for the runtime host.
//!
//! Every function here backs an `ext_hashing_*` import and must be
//! byte-for-byte identical across node implementations. The twox
//! family is xxhash64 run with seeds 0..n-1, each result serialized
//! little-endian and concatenated.

use std::hash::Hasher as _;

use blake2::digest::consts::{U16, U32};
use blake2::{Blake2b, Digest};
use tiny_keccak::Hasher as _;

use crate::Hash;

type Blake2b256 = Blake2b<U32>;
type Blake2b128 = Blake2b<U16>;

/// Blake2b with a 256-bit digest.
pub fn blake2_256(data: &[u8]) -> Hash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Blake2b256::digest(data));
    out
}

/// Blake2b with a 128-bit digest.
pub fn blake2_128(data: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&Blake2b128::digest(data));
    out
}

/// Keccak-256 (the pre-NIST padding variant used by Ethereum).
pub fn keccak_256(data: &[u8]) -> Hash {
    let mut keccak = tiny_keccak::Keccak::v256();
    keccak.update(data);
    let mut out = [0u8; 32];
    keccak.finalize(&mut out);
    out
}

/// SHA-2 with a 256-bit digest.
pub fn sha2_256(data: &[u8]) -> Hash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&sha2::Sha256::digest(data));
    out
}

/// xxhash64 with seed 0, little-endian.
pub fn twox_64(data: &[u8]) -> [u8; 8] {
    let mut h0 = twox_hash::XxHash64::with_seed(0);
    h0.write(data);
    h0.finish().to_le_bytes()
}

/// xxhash64 with seeds 0 and 1, little-endian concatenated.
pub fn twox_128(data: &[u8]) -> [u8; 16] {
    let mut h0 = twox_hash::XxHash64::with_seed(0);
    let mut h1 = twox_hash::XxHash64::with_seed(1);
    h0.write(data);
    h1.write(data);
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&h0.finish().to_le_bytes());
    out[8..].copy_from_slice(&h1.finish().to_le_bytes());
    out
}

/// xxhash64 with seeds 0..=3, little-endian concatenated.
pub fn twox_256(data: &[u8]) -> Hash {
    let mut out = [0u8; 32];
    for seed in 0..4u64 {
        let mut h = twox_hash::XxHash64::with_seed(seed);
        h.write(data);
        out[seed as usize * 8..][..8].copy_from_slice(&h.finish().to_le_bytes());
    }
    out
}
