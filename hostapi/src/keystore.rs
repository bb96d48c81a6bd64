//! Keystores addressed by 4-byte key-type ids.
//!
//! Well-known ids pin the signature scheme their keystore accepts ("gran"
//! is ed25519, the session keys are sr25519). Unknown ids are admitted on
//! demand with an unconstrained scheme, so runtimes can create ephemeral
//! keystores for testing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use filament_primitives::crypto::{KeyType, Pair};
use filament_primitives::KeyTypeId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeystoreError {
    /// The pair's scheme does not match the keystore's pinned scheme.
    #[error("keystore type is {expected} but the pair is {actual}")]
    TypeMismatch { expected: KeyType, actual: KeyType },
}

/// A single keystore holding pairs of one (or any) signature scheme.
pub struct Keystore {
    key_type: KeyType,
    // Insertion order is kept so `public_keys` listings are stable.
    pairs: Mutex<Vec<Pair>>,
}

impl Keystore {
    pub fn new(key_type: KeyType) -> Self {
        Self {
            key_type,
            pairs: Mutex::new(Vec::new()),
        }
    }

    /// The scheme this keystore accepts, `Unknown` when unconstrained.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn insert(&self, pair: Pair) -> Result<(), KeystoreError> {
        if self.key_type != KeyType::Unknown && self.key_type != pair.key_type() {
            return Err(KeystoreError::TypeMismatch {
                expected: self.key_type,
                actual: pair.key_type(),
            });
        }
        let mut pairs = self.pairs.lock();
        let public = pair.public();
        if let Some(existing) = pairs.iter_mut().find(|p| p.public() == public) {
            *existing = pair;
        } else {
            pairs.push(pair);
        }
        Ok(())
    }

    /// All public keys, in insertion order.
    pub fn public_keys(&self) -> Vec<Vec<u8>> {
        self.pairs.lock().iter().map(|p| p.public()).collect()
    }

    /// Public keys of one scheme only.
    pub fn public_keys_of(&self, key_type: KeyType) -> Vec<Vec<u8>> {
        self.pairs
            .lock()
            .iter()
            .filter(|p| p.key_type() == key_type)
            .map(|p| p.public())
            .collect()
    }

    /// Look up the pair for a public key.
    pub fn keypair(&self, public: &[u8]) -> Option<Pair> {
        self.pairs
            .lock()
            .iter()
            .find(|p| p.public() == public)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.pairs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.lock().is_empty()
    }
}

/// The keystore collection shared by all runtime instances.
#[derive(Default)]
pub struct KeystoreSet {
    stores: Mutex<HashMap<KeyTypeId, Arc<Keystore>>>,
}

impl KeystoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The keystore for a key-type id, created on first use.
    pub fn keystore(&self, id: KeyTypeId) -> Arc<Keystore> {
        let mut stores = self.stores.lock();
        stores
            .entry(id)
            .or_insert_with(|| Arc::new(Keystore::new(expected_key_type(id))))
            .clone()
    }
}

/// Scheme pinned to a well-known key-type id.
fn expected_key_type(id: KeyTypeId) -> KeyType {
    match &id {
        b"gran" => KeyType::Ed25519,
        b"babe" | b"aura" | b"acco" | b"imon" | b"audi" | b"para" | b"asgn" => KeyType::Sr25519,
        _ => KeyType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filament_primitives::crypto::{ed25519, sr25519};

    #[test]
    fn test_well_known_ids_pin_schemes() {
        let set = KeystoreSet::new();
        assert_eq!(set.keystore(*b"gran").key_type(), KeyType::Ed25519);
        assert_eq!(set.keystore(*b"babe").key_type(), KeyType::Sr25519);
        assert_eq!(set.keystore(*b"test").key_type(), KeyType::Unknown);
    }

    #[test]
    fn test_same_id_returns_same_store() {
        let set = KeystoreSet::new();
        let a = set.keystore(*b"test");
        a.insert(Pair::Ed25519(ed25519::Pair::generate())).unwrap();
        let b = set.keystore(*b"test");
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let set = KeystoreSet::new();
        let gran = set.keystore(*b"gran");
        let err = gran
            .insert(Pair::Sr25519(sr25519::Pair::generate()))
            .unwrap_err();
        assert_eq!(
            err,
            KeystoreError::TypeMismatch {
                expected: KeyType::Ed25519,
                actual: KeyType::Sr25519,
            }
        );
    }

    #[test]
    fn test_unknown_store_accepts_any_scheme() {
        let store = Keystore::new(KeyType::Unknown);
        store.insert(Pair::Ed25519(ed25519::Pair::generate())).unwrap();
        store.insert(Pair::Sr25519(sr25519::Pair::generate())).unwrap();
        assert_eq!(store.public_keys().len(), 2);
        assert_eq!(store.public_keys_of(KeyType::Ed25519).len(), 1);
    }

    #[test]
    fn test_keypair_lookup_and_overwrite() {
        let store = Keystore::new(KeyType::Ed25519);
        let pair = ed25519::Pair::generate();
        let public = pair.public();
        store.insert(Pair::Ed25519(pair.clone())).unwrap();
        // Re-inserting the same public key keeps a single entry.
        store.insert(Pair::Ed25519(pair)).unwrap();
        assert_eq!(store.len(), 1);

        let found = store.keypair(&public).unwrap();
        assert_eq!(found.public(), public.to_vec());
        assert!(store.keypair(&[0u8; 32]).is_none());
    }
}
