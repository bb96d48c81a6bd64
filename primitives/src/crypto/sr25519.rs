//! Sr25519 (schnorrkel) key pairs and verification.
//!
//! Signing uses the `b"substrate"` signing context. Two verifiers exist:
//! [`verify`] is the strict v2 behaviour, [`verify_deprecated`] accepts the
//! pre-audit signature format that old chain history still contains.

use rand::RngCore as _;
use schnorrkel::{signing_context, ExpansionMode, Keypair, MiniSecretKey, PublicKey, Signature};

use super::CryptoError;

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

const SIGNING_CTX: &[u8] = b"substrate";

/// An sr25519 key pair.
#[derive(Clone)]
pub struct Pair {
    keypair: Keypair,
}

impl Pair {
    /// Draw a fresh pair from the OS entropy source.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    /// Derive a pair from a BIP-39 seed phrase.
    pub fn from_phrase(phrase: &str) -> Result<Self, CryptoError> {
        Ok(Self::from_seed(&super::seed_from_phrase(phrase)?))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mini = MiniSecretKey::from_bytes(&seed[..])
            .expect("a 32-byte slice is always a valid mini secret key; qed");
        Self {
            keypair: mini.expand_to_keypair(ExpansionMode::Ed25519),
        }
    }

    pub fn public(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.keypair.public.to_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.keypair
            .sign(signing_context(SIGNING_CTX).bytes(message))
            .to_bytes()
    }
}

/// Strict verification of an sr25519 signature.
pub fn verify(signature: &[u8], message: &[u8], public_key: &[u8]) -> bool {
    let Ok(public) = PublicKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(sig) = Signature::from_bytes(signature) else {
        return false;
    };
    public
        .verify(signing_context(SIGNING_CTX).bytes(message), &sig)
        .is_ok()
}

/// Verification accepting the pre-audit signature encoding.
pub fn verify_deprecated(signature: &[u8], message: &[u8], public_key: &[u8]) -> bool {
    let Ok(public) = PublicKey::from_bytes(public_key) else {
        return false;
    };
    public
        .verify_simple_preaudit_deprecated(SIGNING_CTX, message, signature)
        .is_ok()
}
