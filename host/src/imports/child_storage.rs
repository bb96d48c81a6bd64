//! `ext_default_child_storage_*` imports.
//!
//! Every operation takes a leading span naming the child trie; children
//! are isolated from the main trie and from each other.

use wasmtime::{Caller, Linker};

use filament_hostapi::Storage as _;
use filament_primitives::trie::Trie;

use crate::context::HostContext;
use crate::error::HostError;
use crate::mem;

use super::storage::{decode_limit, encode_kill_result};
use super::{host_try, memory_of, MODULE};

pub(super) fn register(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    linker.func_wrap(
        MODULE,
        "ext_default_child_storage_set_version_1",
        |mut caller: Caller<'_, HostContext>,
         child_span: i64,
         key_span: i64,
         value_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let child = host_try!(
                mem::read_span(&memory, &caller, child_span.into()),
                (),
                "ext_default_child_storage_set: reading child key"
            );
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                (),
                "ext_default_child_storage_set: reading key"
            );
            let value = host_try!(
                mem::read_span(&memory, &caller, value_span.into()),
                (),
                "ext_default_child_storage_set: reading value"
            );
            caller.data_mut().storage.child_put(&child, key, value);
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_default_child_storage_get_version_1",
        |mut caller: Caller<'_, HostContext>, child_span: i64, key_span: i64| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let child = host_try!(
                mem::read_span(&memory, &caller, child_span.into()),
                0,
                "ext_default_child_storage_get: reading child key"
            );
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                0,
                "ext_default_child_storage_get: reading key"
            );
            let value = caller.data().storage.child_get(&child, &key);
            let out = host_try!(
                mem::write_option(&memory, &mut caller, value.as_deref()),
                0,
                "ext_default_child_storage_get: writing value"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_default_child_storage_read_version_1",
        |mut caller: Caller<'_, HostContext>,
         child_span: i64,
         key_span: i64,
         value_out_span: i64,
         offset: i32|
         -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let child = host_try!(
                mem::read_span(&memory, &caller, child_span.into()),
                0,
                "ext_default_child_storage_read: reading child key"
            );
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                0,
                "ext_default_child_storage_read: reading key"
            );
            let Some(value) = caller.data().storage.child_get(&child, &key) else {
                let out = host_try!(
                    mem::write_option(&memory, &mut caller, None),
                    0,
                    "ext_default_child_storage_read: writing none"
                );
                return out.as_i64();
            };

            let mut size = 0u32;
            let offset = offset as usize;
            if offset <= value.len() {
                let tail = &value[offset..];
                size = tail.len() as u32;
                let out_span = mem::PointerSize::from(value_out_span);
                let copy_len = tail.len().min(out_span.length() as usize);
                host_try!(
                    mem::write_bytes(&memory, &mut caller, out_span.pointer(), &tail[..copy_len]),
                    0,
                    "ext_default_child_storage_read: writing value"
                );
            }

            let out = host_try!(
                mem::write_option_u32(&memory, &mut caller, Some(size)),
                0,
                "ext_default_child_storage_read: writing size"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_default_child_storage_clear_version_1",
        |mut caller: Caller<'_, HostContext>, child_span: i64, key_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let child = host_try!(
                mem::read_span(&memory, &caller, child_span.into()),
                (),
                "ext_default_child_storage_clear: reading child key"
            );
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                (),
                "ext_default_child_storage_clear: reading key"
            );
            caller.data_mut().storage.child_delete(&child, &key);
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_default_child_storage_clear_prefix_version_1",
        |mut caller: Caller<'_, HostContext>, child_span: i64, prefix_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let child = host_try!(
                mem::read_span(&memory, &caller, child_span.into()),
                (),
                "ext_default_child_storage_clear_prefix: reading child key"
            );
            let prefix = host_try!(
                mem::read_span(&memory, &caller, prefix_span.into()),
                (),
                "ext_default_child_storage_clear_prefix: reading prefix"
            );
            caller.data_mut().storage.child_clear_prefix(&child, &prefix);
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_default_child_storage_exists_version_1",
        |mut caller: Caller<'_, HostContext>, child_span: i64, key_span: i64| -> i32 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let child = host_try!(
                mem::read_span(&memory, &caller, child_span.into()),
                0,
                "ext_default_child_storage_exists: reading child key"
            );
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                0,
                "ext_default_child_storage_exists: reading key"
            );
            caller.data().storage.child_get(&child, &key).is_some() as i32
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_default_child_storage_next_key_version_1",
        |mut caller: Caller<'_, HostContext>, child_span: i64, key_span: i64| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let child = host_try!(
                mem::read_span(&memory, &caller, child_span.into()),
                0,
                "ext_default_child_storage_next_key: reading child key"
            );
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                0,
                "ext_default_child_storage_next_key: reading key"
            );
            let next = caller.data().storage.child_next_key(&child, &key);
            let out = host_try!(
                mem::write_option(&memory, &mut caller, next.as_deref()),
                0,
                "ext_default_child_storage_next_key: writing key"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_default_child_storage_root_version_1",
        |mut caller: Caller<'_, HostContext>, child_span: i64| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let child = host_try!(
                mem::read_span(&memory, &caller, child_span.into()),
                0,
                "ext_default_child_storage_root: reading child key"
            );
            // A missing child reports the empty trie root.
            let root = caller
                .data()
                .storage
                .child_root(&child)
                .unwrap_or_else(|| Trie::new().root_hash());
            let out = host_try!(
                mem::write_option(&memory, &mut caller, Some(&root)),
                0,
                "ext_default_child_storage_root: writing root"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_default_child_storage_storage_kill_version_1",
        |mut caller: Caller<'_, HostContext>, child_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let child = host_try!(
                mem::read_span(&memory, &caller, child_span.into()),
                (),
                "ext_default_child_storage_storage_kill: reading child key"
            );
            caller.data_mut().storage.delete_child(&child);
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_default_child_storage_storage_kill_version_2",
        |mut caller: Caller<'_, HostContext>, child_span: i64, limit_span: i64| -> i32 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let child = host_try!(
                mem::read_span(&memory, &caller, child_span.into()),
                0,
                "ext_default_child_storage_storage_kill_v2: reading child key"
            );
            let limit_bytes = host_try!(
                mem::read_span(&memory, &caller, limit_span.into()),
                0,
                "ext_default_child_storage_storage_kill_v2: reading limit"
            );
            let limit = decode_limit(&limit_bytes);

            let (_, all_removed) = caller.data_mut().storage.delete_child_limit(&child, limit);
            all_removed as i32
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_default_child_storage_storage_kill_version_3",
        |mut caller: Caller<'_, HostContext>, child_span: i64, limit_span: i64| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let child = host_try!(
                mem::read_span(&memory, &caller, child_span.into()),
                0,
                "ext_default_child_storage_storage_kill_v3: reading child key"
            );
            let limit_bytes = host_try!(
                mem::read_span(&memory, &caller, limit_span.into()),
                0,
                "ext_default_child_storage_storage_kill_v3: reading limit"
            );
            let limit = decode_limit(&limit_bytes);

            let (removed, all_removed) =
                caller.data_mut().storage.delete_child_limit(&child, limit);
            let out = host_try!(
                mem::write_owned(&memory, &mut caller, &encode_kill_result(removed, all_removed)),
                0,
                "ext_default_child_storage_storage_kill_v3: writing result"
            );
            out.as_i64()
        },
    )?;

    Ok(())
}
