//! Deferred signature-verification batcher.
//!
//! While a batch is open every `ext_crypto_*_verify` import queues its
//! signature and reports success immediately; the runtime later calls
//! `ext_crypto_finish_batch_verify_version_1` to collect the aggregate
//! verdict. The batcher is shared across instances and synchronises
//! internally. Verification itself runs synchronously inside `finish` —
//! batching policy beyond deferral is out of scope.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use filament_primitives::crypto::SignatureInfo;

/// Shared deferred-verification batcher.
#[derive(Default)]
pub struct SignatureVerifier {
    started: AtomicBool,
    queue: Mutex<Vec<SignatureInfo>>,
}

impl SignatureVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a batch. Queued signatures from a previous unfinished batch are
    /// discarded.
    pub fn start(&self) {
        self.queue.lock().clear();
        self.started.store(true, Ordering::SeqCst);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Queue a signature for deferred verification.
    pub fn add(&self, info: SignatureInfo) {
        self.queue.lock().push(info);
    }

    /// Close the batch and verify everything queued. Returns `true` when
    /// every signature verified.
    pub fn finish(&self) -> bool {
        self.started.store(false, Ordering::SeqCst);
        let queue = std::mem::take(&mut *self.queue.lock());
        queue
            .iter()
            .all(|info| (info.verify)(&info.signature, &info.message, &info.public_key))
    }
}
