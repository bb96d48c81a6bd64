//! `filament-hostapi` — collaborator interfaces for the Filament runtime host.
//!
//! The host-function layer delegates everything stateful to the services
//! defined here:
//!
//! - `Storage` trait and the `TrieState` overlay with nested transactions
//! - `KeystoreSet` — keystores addressed by 4-byte key-type ids
//! - `SignatureVerifier` — the deferred batch-verification collaborator
//! - `TransactionPool` and an in-memory default
//! - offchain services: node KV stores, the HTTP request registry and the
//!   network-state provider
//! - `Tries` — the shared state-root → trie cache
//!
//! Shared services synchronise internally; per-instance state (storage,
//! the HTTP registry) must not be shared across instances.

pub mod keystore;
pub mod offchain;
pub mod sig_verifier;
pub mod storage;
pub mod transaction;
pub mod tries;
pub mod trie_state;

pub use keystore::{Keystore, KeystoreError, KeystoreSet};
pub use offchain::{
    HttpError, InMemoryKv, KeyValueStore, Network, NetworkState, NodeStorage, OffchainHttpSet,
    StorageKind,
};
pub use sig_verifier::SignatureVerifier;
pub use storage::Storage;
pub use transaction::{InMemoryPool, TransactionPool, TransactionValidity, ValidTransaction};
pub use tries::Tries;
pub use trie_state::TrieState;
