//! Ed25519 key pairs and verification.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};

use super::CryptoError;

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

/// An ed25519 key pair.
#[derive(Clone)]
pub struct Pair {
    signing: SigningKey,
}

impl Pair {
    /// Draw a fresh pair from the OS entropy source.
    pub fn generate() -> Self {
        let signing = SigningKey::generate(&mut rand::rngs::OsRng);
        Self { signing }
    }

    /// Derive a pair from a BIP-39 seed phrase.
    pub fn from_phrase(phrase: &str) -> Result<Self, CryptoError> {
        Ok(Self::from_seed(&super::seed_from_phrase(phrase)?))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    pub fn public(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.signing.verifying_key().to_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing.sign(message).to_bytes()
    }
}

/// Verify an ed25519 signature. Malformed inputs verify as `false`.
pub fn verify(signature: &[u8], message: &[u8], public_key: &[u8]) -> bool {
    let Ok(sig_bytes) = <[u8; SIGNATURE_LEN]>::try_from(signature) else {
        return false;
    };
    let Ok(pk_bytes) = <[u8; PUBLIC_KEY_LEN]>::try_from(public_key) else {
        return false;
    };
    let Ok(verifying) = VerifyingKey::from_bytes(&pk_bytes) else {
        return false;
    };
    verifying
        .verify(message, &Signature::from_bytes(&sig_bytes))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let pair = Pair::generate();
        let sig = pair.sign(b"all ok!");
        assert!(verify(&sig, b"all ok!", &pair.public()));
        assert!(!verify(&sig, b"all is not ok!", &pair.public()));
    }

    #[test]
    fn test_seed_determinism() {
        let a = Pair::from_seed(&[7u8; 32]);
        let b = Pair::from_seed(&[7u8; 32]);
        assert_eq!(a.public(), b.public());
    }

    #[test]
    fn test_verify_rejects_malformed_inputs() {
        let pair = Pair::generate();
        let sig = pair.sign(b"msg");
        assert!(!verify(&sig[..63], b"msg", &pair.public()));
        assert!(!verify(&sig, b"msg", &pair.public()[..31]));
    }
}
