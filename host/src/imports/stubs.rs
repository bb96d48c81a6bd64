//! Imports registered for link-time completeness only.
//!
//! Transaction indexing and the in-runtime sandbox are not wired to any
//! provider; the stubs log and return zero where a value is expected.

use wasmtime::{Caller, Linker};

use crate::context::HostContext;
use crate::error::HostError;

use super::MODULE;

pub(super) fn register(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    linker.func_wrap(
        MODULE,
        "ext_transaction_index_index_version_1",
        |_caller: Caller<'_, HostContext>, _extrinsic: i32, _size: i32, _context_hash: i32| {
            log::warn!(target: "host", "ext_transaction_index_index_version_1 unimplemented");
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_transaction_index_renew_version_1",
        |_caller: Caller<'_, HostContext>, _extrinsic: i32, _hash: i32| {
            log::warn!(target: "host", "ext_transaction_index_renew_version_1 unimplemented");
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_sandbox_instantiate_version_1",
        |_caller: Caller<'_, HostContext>,
         _dispatch_thunk: i32,
         _wasm_span: i64,
         _imports_span: i64,
         _state: i32|
         -> i32 {
            log::warn!(target: "host", "ext_sandbox_instantiate_version_1 unimplemented");
            0
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_sandbox_instance_teardown_version_1",
        |_caller: Caller<'_, HostContext>, _instance_id: i32| {
            log::warn!(target: "host", "ext_sandbox_instance_teardown_version_1 unimplemented");
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_sandbox_invoke_version_1",
        |_caller: Caller<'_, HostContext>,
         _instance_id: i32,
         _export_span: i64,
         _args_span: i64,
         _return_ptr: i32,
         _return_len: i32,
         _state: i32|
         -> i32 {
            log::warn!(target: "host", "ext_sandbox_invoke_version_1 unimplemented");
            0
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_sandbox_memory_new_version_1",
        |_caller: Caller<'_, HostContext>, _initial: i32, _maximum: i32| -> i32 {
            log::warn!(target: "host", "ext_sandbox_memory_new_version_1 unimplemented");
            0
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_sandbox_memory_get_version_1",
        |_caller: Caller<'_, HostContext>,
         _memory_id: i32,
         _offset: i32,
         _buf_ptr: i32,
         _buf_len: i32|
         -> i32 {
            log::warn!(target: "host", "ext_sandbox_memory_get_version_1 unimplemented");
            0
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_sandbox_memory_set_version_1",
        |_caller: Caller<'_, HostContext>,
         _memory_id: i32,
         _offset: i32,
         _val_ptr: i32,
         _val_len: i32|
         -> i32 {
            log::warn!(target: "host", "ext_sandbox_memory_set_version_1 unimplemented");
            0
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_sandbox_memory_teardown_version_1",
        |_caller: Caller<'_, HostContext>, _memory_id: i32| {
            log::warn!(target: "host", "ext_sandbox_memory_teardown_version_1 unimplemented");
        },
    )?;

    Ok(())
}
