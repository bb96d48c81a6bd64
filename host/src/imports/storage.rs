//! `ext_storage_*` imports.

use codec::Decode;
use wasmtime::{Caller, Linker};

use filament_hostapi::Storage as _;
use filament_primitives::codec::append_compact_sequence;

use crate::context::HostContext;
use crate::error::HostError;
use crate::mem;

use super::{host_try, memory_of, MODULE};

/// Decode a SCALE `Option<bytes>` limit span: `None` (or a malformed
/// payload) means unlimited, otherwise the first four bytes little-endian.
pub(super) fn decode_limit(limit_bytes: &[u8]) -> Option<u32> {
    match Option::<Vec<u8>>::decode(&mut &limit_bytes[..]) {
        Ok(Some(bytes)) if bytes.len() >= 4 => {
            Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        Ok(Some(_)) | Ok(None) => None,
        Err(err) => {
            log::warn!(target: "host", "failed to decode storage limit: {err}");
            None
        }
    }
}

/// Encode a storage-kill result: tag 0 when everything was removed within
/// the limit, tag 1 when keys remain, followed by the removed count.
pub(super) fn encode_kill_result(removed: u32, all_removed: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    out.push(if all_removed { 0 } else { 1 });
    out.extend_from_slice(&removed.to_le_bytes());
    out
}

pub(super) fn register(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    linker.func_wrap(
        MODULE,
        "ext_storage_set_version_1",
        |mut caller: Caller<'_, HostContext>, key_span: i64, value_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                (),
                "ext_storage_set: reading key"
            );
            let value = host_try!(
                mem::read_span(&memory, &caller, value_span.into()),
                (),
                "ext_storage_set: reading value"
            );
            log::trace!(
                target: "host",
                "storage set key=0x{} value=0x{}",
                hex::encode(&key),
                hex::encode(&value)
            );
            caller.data_mut().storage.put(key, value);
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_get_version_1",
        |mut caller: Caller<'_, HostContext>, key_span: i64| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                0,
                "ext_storage_get: reading key"
            );
            let value = caller.data().storage.get(&key);
            log::trace!(
                target: "host",
                "storage get key=0x{} found={}",
                hex::encode(&key),
                value.is_some()
            );
            let out = host_try!(
                mem::write_option(&memory, &mut caller, value.as_deref()),
                0,
                "ext_storage_get: writing value"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_read_version_1",
        |mut caller: Caller<'_, HostContext>,
         key_span: i64,
         value_out_span: i64,
         offset: i32|
         -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                0,
                "ext_storage_read: reading key"
            );
            let Some(value) = caller.data().storage.get(&key) else {
                let out = host_try!(
                    mem::write_option(&memory, &mut caller, None),
                    0,
                    "ext_storage_read: writing none"
                );
                return out.as_i64();
            };

            // Copy the value tail into the caller's buffer; the reported
            // size is the remaining length, not the copied length.
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
                    "ext_storage_read: writing value"
                );
            }

            let out = host_try!(
                mem::write_option_u32(&memory, &mut caller, Some(size)),
                0,
                "ext_storage_read: writing size"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_clear_version_1",
        |mut caller: Caller<'_, HostContext>, key_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                (),
                "ext_storage_clear: reading key"
            );
            log::trace!(target: "host", "storage clear key=0x{}", hex::encode(&key));
            caller.data_mut().storage.delete(&key);
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_exists_version_1",
        |mut caller: Caller<'_, HostContext>, key_span: i64| -> i32 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                0,
                "ext_storage_exists: reading key"
            );
            caller.data().storage.exists(&key) as i32
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_clear_prefix_version_1",
        |mut caller: Caller<'_, HostContext>, prefix_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let prefix = host_try!(
                mem::read_span(&memory, &caller, prefix_span.into()),
                (),
                "ext_storage_clear_prefix: reading prefix"
            );
            caller.data_mut().storage.clear_prefix(&prefix);
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_clear_prefix_version_2",
        |mut caller: Caller<'_, HostContext>, prefix_span: i64, limit_span: i64| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let prefix = host_try!(
                mem::read_span(&memory, &caller, prefix_span.into()),
                0,
                "ext_storage_clear_prefix_v2: reading prefix"
            );
            let limit_bytes = host_try!(
                mem::read_span(&memory, &caller, limit_span.into()),
                0,
                "ext_storage_clear_prefix_v2: reading limit"
            );
            let limit = decode_limit(&limit_bytes).unwrap_or(u32::MAX);

            let (removed, all_removed) =
                caller.data_mut().storage.clear_prefix_limit(&prefix, limit);
            let out = host_try!(
                mem::write_owned(&memory, &mut caller, &encode_kill_result(removed, all_removed)),
                0,
                "ext_storage_clear_prefix_v2: writing result"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_append_version_1",
        |mut caller: Caller<'_, HostContext>, key_span: i64, value_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                (),
                "ext_storage_append: reading key"
            );
            let value = host_try!(
                mem::read_span(&memory, &caller, value_span.into()),
                (),
                "ext_storage_append: reading value"
            );
            log::trace!(
                target: "host",
                "append value 0x{} to key 0x{}",
                hex::encode(&value),
                hex::encode(&key)
            );

            let stored = caller.data().storage.get(&key);
            let appended = append_compact_sequence(stored.as_deref(), &value);
            caller.data_mut().storage.put(key, appended);
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_next_key_version_1",
        |mut caller: Caller<'_, HostContext>, key_span: i64| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                0,
                "ext_storage_next_key: reading key"
            );
            let next = caller.data().storage.next_key(&key);
            let out = host_try!(
                mem::write_option(&memory, &mut caller, next.as_deref()),
                0,
                "ext_storage_next_key: writing key"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_root_version_1",
        |mut caller: Caller<'_, HostContext>| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let root = caller.data().storage.root();
            log::trace!(target: "host", "storage root is 0x{}", hex::encode(root));
            let out = host_try!(
                mem::write_owned(&memory, &mut caller, &root),
                0,
                "ext_storage_root: writing root"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_root_version_2",
        |mut caller: Caller<'_, HostContext>, _state_version: i32| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let root = caller.data().storage.root();
            let out = host_try!(
                mem::write_owned(&memory, &mut caller, &root),
                0,
                "ext_storage_root_v2: writing root"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_changes_root_version_1",
        |mut caller: Caller<'_, HostContext>, _parent_hash_span: i64| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            // Deprecated upstream; the answer is always `None`.
            let out = host_try!(
                mem::write_option(&memory, &mut caller, None),
                0,
                "ext_storage_changes_root: writing none"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_storage_start_transaction_version_1",
        |mut caller: Caller<'_, HostContext>| {
            caller.data_mut().storage.begin_transaction();
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_storage_commit_transaction_version_1",
        |mut caller: Caller<'_, HostContext>| {
            caller.data_mut().storage.commit_transaction();
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_storage_rollback_transaction_version_1",
        |mut caller: Caller<'_, HostContext>| {
            caller.data_mut().storage.rollback_transaction();
        },
    )?;

    Ok(())
}
