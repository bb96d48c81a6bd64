//! Transaction pool collaborator.
//!
//! `ext_offchain_submit_transaction_version_1` wraps the decoded extrinsic
//! in a minimally-filled validity record and hands it to the pool. Pools
//! are shared across instances.

use codec::{Decode, Encode};
use parking_lot::Mutex;

/// Validity metadata attached to a pooled transaction.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct TransactionValidity {
    pub priority: u64,
    pub requires: Vec<Vec<u8>>,
    pub provides: Vec<Vec<u8>>,
    pub longevity: u64,
    pub propagate: bool,
}

impl TransactionValidity {
    /// The placeholder record used for offchain submissions: zero priority
    /// and longevity, single empty dependency tags, no propagation.
    pub fn minimal() -> Self {
        Self {
            priority: 0,
            requires: vec![vec![]],
            provides: vec![vec![]],
            longevity: 0,
            propagate: false,
        }
    }
}

/// A validated extrinsic ready for pooling.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ValidTransaction {
    pub extrinsic: Vec<u8>,
    pub validity: TransactionValidity,
}

impl ValidTransaction {
    pub fn new(extrinsic: Vec<u8>, validity: TransactionValidity) -> Self {
        Self {
            extrinsic,
            validity,
        }
    }
}

/// The pool collaborator interface.
pub trait TransactionPool: Send + Sync {
    fn add_to_pool(&self, transaction: ValidTransaction);
}

/// In-memory pool for node wiring and tests.
#[derive(Default)]
pub struct InMemoryPool {
    transactions: Mutex<Vec<ValidTransaction>>,
}

impl InMemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the pooled transactions, in submission order.
    pub fn transactions(&self) -> Vec<ValidTransaction> {
        self.transactions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.transactions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.lock().is_empty()
    }
}

impl TransactionPool for InMemoryPool {
    fn add_to_pool(&self, transaction: ValidTransaction) {
        self.transactions.lock().push(transaction);
    }
}
