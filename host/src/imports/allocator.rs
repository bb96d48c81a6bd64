//! `ext_allocator_*` imports.
//!
//! The runtime performs its heap management through these two calls.
//! Exhaustion on `malloc` is the one marshalling failure that traps the
//! instance: the runtime cannot make progress without memory, and an
//! in-band sentinel would be indistinguishable from a valid pointer 0.

use anyhow::anyhow;
use wasmtime::{Caller, Linker};

use crate::context::HostContext;
use crate::error::HostError;
use crate::mem;

use super::{memory_of, MODULE};

pub(super) fn register(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    linker.func_wrap(
        MODULE,
        "ext_allocator_malloc_version_1",
        |mut caller: Caller<'_, HostContext>, size: i32| -> anyhow::Result<i32> {
            let Some(memory) = memory_of(&mut caller) else {
                return Err(anyhow!("runtime has no exported linear memory"));
            };
            log::trace!(target: "wasm-heap", "malloc {size} bytes");
            match mem::allocate(&memory, &mut caller, size as u32) {
                Ok(ptr) => Ok(ptr as i32),
                Err(err) => {
                    log::error!(target: "host", "failed to allocate memory: {err}");
                    Err(anyhow!("failed to allocate {size} bytes: {err}"))
                }
            }
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_allocator_free_version_1",
        |mut caller: Caller<'_, HostContext>, ptr: i32| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            log::trace!(target: "wasm-heap", "free {ptr}");
            if let Err(err) = mem::deallocate(&memory, &mut caller, ptr as u32) {
                log::error!(target: "host", "failed to free memory: {err}");
            }
        },
    )?;

    Ok(())
}
