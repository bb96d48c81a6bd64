//! The host import dispatch table.
//!
//! Every `ext_*` function the runtime links against is registered here on
//! the wasmtime linker, grouped by family. Each import follows the same
//! discipline: unmarshal spans from linear memory, delegate to a provider,
//! marshal the response back through the allocator, and translate every
//! recoverable failure into the in-band sentinel the runtime expects
//! (pointer 0, encoded `None`, a `Result::Err` envelope or boolean 0).
//! Only `ext_allocator_malloc_version_1` exhaustion and sr25519 keypair
//! generation failure trap the instance.

use wasmtime::{Caller, Linker, Memory};

use crate::context::HostContext;
use crate::error::HostError;
use crate::mem;

mod allocator;
mod child_storage;
mod crypto;
mod hashing;
mod logging;
mod misc;
mod offchain;
mod storage;
mod stubs;
mod trie;

/// Import module name expected by the runtime.
pub(crate) const MODULE: &str = "env";

/// Register every host import with the linker.
pub fn register_host_functions(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    logging::register(linker)?;
    crypto::register(linker)?;
    hashing::register(linker)?;
    trie::register(linker)?;
    storage::register(linker)?;
    child_storage::register(linker)?;
    offchain::register(linker)?;
    misc::register(linker)?;
    allocator::register(linker)?;
    stubs::register(linker)?;
    Ok(())
}

/// The guest's exported memory; logs when the export is missing.
pub(crate) fn memory_of(caller: &mut Caller<'_, HostContext>) -> Option<Memory> {
    let memory = mem::exported_memory(caller);
    if memory.is_none() {
        log::error!(target: "host", "runtime has no exported linear memory");
    }
    memory
}

/// Evaluate a fallible marshalling step; on failure log and return the
/// given sentinel from the enclosing host function.
macro_rules! host_try {
    ($expr:expr, $sentinel:expr, $what:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => {
                log::error!(target: "host", "{}: {}", $what, err);
                return $sentinel;
            }
        }
    };
}
pub(crate) use host_try;
