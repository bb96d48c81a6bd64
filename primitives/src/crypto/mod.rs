//! Key handling for the runtime host.
//!
//! Three signature schemes are exposed to the runtime: ed25519, sr25519 and
//! secp256k1 ECDSA. Each submodule provides a `Pair` with deterministic
//! seed-phrase derivation plus free `verify` functions matching the
//! [`VerifyFn`] shape the deferred-verification batcher consumes.

use bip39::{Language, Mnemonic, Seed};

pub mod ecdsa;
pub mod ed25519;
pub mod sr25519;

/// Error raised by key construction and recovery.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The seed bytes are not a valid BIP-39 phrase.
    #[error("invalid seed phrase")]
    InvalidPhrase,
    /// A public key could not be parsed from its byte form.
    #[error("invalid public key")]
    InvalidPublicKey,
    /// A signature (or its recovery id) could not be parsed.
    #[error("invalid signature")]
    InvalidSignature,
    /// ECDSA public-key recovery failed.
    #[error("public key recovery failed")]
    RecoveryFailed,
}

/// Signature scheme of a keystore or key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Ed25519,
    Sr25519,
    Ecdsa,
    /// No scheme pinned yet; any pair may be inserted.
    Unknown,
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::Sr25519 => "sr25519",
            KeyType::Ecdsa => "ecdsa",
            KeyType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Verification entry point stored alongside a queued signature.
pub type VerifyFn = fn(signature: &[u8], message: &[u8], public_key: &[u8]) -> bool;

/// A signature queued for deferred batch verification.
#[derive(Clone)]
pub struct SignatureInfo {
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
    pub message: Vec<u8>,
    pub verify: VerifyFn,
}

/// A key pair of any supported scheme.
#[derive(Clone)]
pub enum Pair {
    Ed25519(ed25519::Pair),
    Sr25519(sr25519::Pair),
    Ecdsa(ecdsa::Pair),
}

impl Pair {
    pub fn key_type(&self) -> KeyType {
        match self {
            Pair::Ed25519(_) => KeyType::Ed25519,
            Pair::Sr25519(_) => KeyType::Sr25519,
            Pair::Ecdsa(_) => KeyType::Ecdsa,
        }
    }

    /// Public key in its canonical byte form (32 bytes, or 33 for ECDSA).
    pub fn public(&self) -> Vec<u8> {
        match self {
            Pair::Ed25519(p) => p.public().to_vec(),
            Pair::Sr25519(p) => p.public().to_vec(),
            Pair::Ecdsa(p) => p.public().to_vec(),
        }
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Pair::Ed25519(p) => p.sign(message).to_vec(),
            Pair::Sr25519(p) => p.sign(message).to_vec(),
            Pair::Ecdsa(p) => p.sign(message).to_vec(),
        }
    }
}

/// Derive a 32-byte secret seed from a BIP-39 phrase with an empty password.
pub(crate) fn seed_from_phrase(phrase: &str) -> Result<[u8; 32], CryptoError> {
    let mnemonic =
        Mnemonic::from_phrase(phrase, Language::English).map_err(|_| CryptoError::InvalidPhrase)?;
    let seed = Seed::new(&mnemonic, "");
    let mut out = [0u8; 32];
    out.copy_from_slice(&seed.as_bytes()[..32]);
    Ok(out)
}
