//! Per-instance host context.
//!
//! One `HostContext` lives in each wasmtime `Store` and is reachable from
//! every host call through the caller. Storage, the HTTP registry and the
//! allocator are instance-private; the keystore, signature batcher,
//! transaction pool, node KV stores and network provider are shared
//! services with their own synchronisation.

use std::sync::Arc;

use filament_hostapi::{
    KeystoreSet, Network, NodeStorage, OffchainHttpSet, SignatureVerifier, Storage,
    TransactionPool, TrieState,
};

use crate::allocator::FreeingBumpHeapAllocator;

/// Execution context shared by every host call of one runtime instance.
pub struct HostContext {
    pub storage: Box<dyn Storage>,
    pub keystore: Arc<KeystoreSet>,
    pub sig_verifier: Arc<SignatureVerifier>,
    pub transaction_pool: Arc<dyn TransactionPool>,
    pub node_storage: NodeStorage,
    pub http: OffchainHttpSet,
    pub network: Option<Arc<dyn Network>>,
    pub is_validator: bool,
    pub allocator: FreeingBumpHeapAllocator,
}

impl HostContext {
    /// A context over the given storage with fresh default collaborators.
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self {
            storage,
            keystore: Arc::new(KeystoreSet::new()),
            sig_verifier: Arc::new(SignatureVerifier::new()),
            transaction_pool: Arc::new(filament_hostapi::InMemoryPool::new()),
            node_storage: NodeStorage::in_memory(),
            http: OffchainHttpSet::new(),
            network: None,
            is_validator: false,
            allocator: FreeingBumpHeapAllocator::new(0),
        }
    }

    /// A context over empty in-memory trie state.
    pub fn with_trie_state() -> Self {
        Self::new(Box::new(TrieState::new()))
    }
}
