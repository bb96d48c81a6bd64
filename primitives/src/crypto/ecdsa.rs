//! Secp256k1 ECDSA key pairs, verification and public-key recovery.
//!
//! Signatures are 65 bytes: the 64-byte compact signature followed by the
//! recovery id. Messages passed to [`verify`], [`recover`] and
//! [`recover_compressed`] are 32-byte hashes.

use libsecp256k1::{Message, PublicKey, RecoveryId, SecretKey, Signature};

use super::CryptoError;
use crate::hashing::blake2_256;

pub const PUBLIC_KEY_LEN: usize = 33;
pub const SIGNATURE_LEN: usize = 65;

/// A secp256k1 ECDSA key pair.
#[derive(Clone)]
pub struct Pair {
    secret: SecretKey,
}

impl Pair {
    /// Draw a fresh pair from the OS entropy source.
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Derive a pair from a BIP-39 seed phrase.
    pub fn from_phrase(phrase: &str) -> Result<Self, CryptoError> {
        Self::from_seed(&super::seed_from_phrase(phrase)?)
    }

    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::parse(seed).map_err(|_| CryptoError::InvalidPhrase)?;
        Ok(Self { secret })
    }

    /// Compressed SEC-1 public key.
    pub fn public(&self) -> [u8; PUBLIC_KEY_LEN] {
        PublicKey::from_secret_key(&self.secret).serialize_compressed()
    }

    /// Sign the blake2b-256 hash of `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        let hash = blake2_256(message);
        let (sig, recovery_id) = libsecp256k1::sign(&Message::parse(&hash), &self.secret);
        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&sig.serialize());
        out[64] = recovery_id.serialize();
        out
    }
}

/// Normalise an Ethereum-style recovery byte (27/28) down to 0..=3.
fn parse_recovery_id(byte: u8) -> Result<RecoveryId, CryptoError> {
    let v = if byte > 26 { byte - 27 } else { byte };
    RecoveryId::parse(v).map_err(|_| CryptoError::InvalidSignature)
}

/// Recover the uncompressed public key (X ‖ Y, without the 0x04 prefix).
pub fn recover(signature: &[u8; 65], message_hash: &[u8; 32]) -> Result<[u8; 64], CryptoError> {
    let sig = Signature::parse_standard_slice(&signature[..64])
        .map_err(|_| CryptoError::InvalidSignature)?;
    let recovery_id = parse_recovery_id(signature[64])?;
    let public = libsecp256k1::recover(&Message::parse(message_hash), &sig, &recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    let mut out = [0u8; 64];
    out.copy_from_slice(&public.serialize()[1..]);
    Ok(out)
}

/// Recover the compressed 33-byte public key.
pub fn recover_compressed(
    signature: &[u8; 65],
    message_hash: &[u8; 32],
) -> Result<[u8; 33], CryptoError> {
    let sig = Signature::parse_standard_slice(&signature[..64])
        .map_err(|_| CryptoError::InvalidSignature)?;
    let recovery_id = parse_recovery_id(signature[64])?;
    let public = libsecp256k1::recover(&Message::parse(message_hash), &sig, &recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(public.serialize_compressed())
}

/// Verify a signature over a 32-byte message hash.
///
/// Accepts 64- or 65-byte signatures (the recovery byte is ignored) and
/// compressed or uncompressed public keys.
pub fn verify(signature: &[u8], message_hash: &[u8], public_key: &[u8]) -> bool {
    if signature.len() < 64 {
        return false;
    }
    let Ok(hash) = <[u8; 32]>::try_from(message_hash) else {
        return false;
    };
    let Ok(sig) = Signature::parse_overflowing_slice(&signature[..64]) else {
        return false;
    };
    let Ok(public) = PublicKey::parse_slice(public_key, None) else {
        return false;
    };
    libsecp256k1::verify(&Message::parse(&hash), &sig, &public)
}
