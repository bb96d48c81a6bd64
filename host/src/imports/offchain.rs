//! `ext_offchain_*` imports.
//!
//! These back the offchain worker surface: the chain-indexing KV write,
//! local/persistent storage, validator flag, network state, randomness,
//! time, transaction submission and the HTTP request registry.

use codec::Decode;
use rand::RngCore as _;
use wasmtime::{Caller, Linker};

use filament_hostapi::{
    KeyValueStore as _, Network as _, StorageKind, TransactionPool as _, TransactionValidity,
    ValidTransaction,
};

use crate::context::HostContext;
use crate::error::HostError;
use crate::mem;

use super::{host_try, memory_of, MODULE};

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub(super) fn register(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    linker.func_wrap(
        MODULE,
        "ext_offchain_index_set_version_1",
        |mut caller: Caller<'_, HostContext>, key_span: i64, value_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                (),
                "ext_offchain_index_set: reading key"
            );
            let value = host_try!(
                mem::read_span(&memory, &caller, value_span.into()),
                (),
                "ext_offchain_index_set: reading value"
            );
            caller.data().node_storage.base.put(key, value);
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_local_storage_set_version_1",
        |mut caller: Caller<'_, HostContext>, kind: i32, key_span: i64, value_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let Some(kind) = StorageKind::from_u32(kind as u32) else {
                log::warn!(target: "host", "ext_offchain_local_storage_set: unknown storage kind {kind}");
                return;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                (),
                "ext_offchain_local_storage_set: reading key"
            );
            let value = host_try!(
                mem::read_span(&memory, &caller, value_span.into()),
                (),
                "ext_offchain_local_storage_set: reading value"
            );
            caller.data().node_storage.kind(kind).put(key, value);
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_local_storage_get_version_1",
        |mut caller: Caller<'_, HostContext>, kind: i32, key_span: i64| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let Some(kind) = StorageKind::from_u32(kind as u32) else {
                log::warn!(target: "host", "ext_offchain_local_storage_get: unknown storage kind {kind}");
                return 0;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                0,
                "ext_offchain_local_storage_get: reading key"
            );
            let value = caller.data().node_storage.kind(kind).get(&key);
            let out = host_try!(
                mem::write_option(&memory, &mut caller, value.as_deref()),
                0,
                "ext_offchain_local_storage_get: writing value"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_local_storage_clear_version_1",
        |mut caller: Caller<'_, HostContext>, kind_ptr: i32, key_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            // Unlike its siblings, this import passes the kind indirectly:
            // the argument points at a little-endian u32 in linear memory.
            let kind_bytes: [u8; 4] = host_try!(
                mem::read_array(&memory, &caller, kind_ptr as u32),
                (),
                "ext_offchain_local_storage_clear: reading kind"
            );
            let kind_value = u32::from_le_bytes(kind_bytes);
            let Some(kind) = StorageKind::from_u32(kind_value) else {
                log::warn!(
                    target: "host",
                    "ext_offchain_local_storage_clear: unknown storage kind {kind_value}"
                );
                return;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                (),
                "ext_offchain_local_storage_clear: reading key"
            );
            caller.data().node_storage.kind(kind).delete(&key);
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_local_storage_compare_and_set_version_1",
        |mut caller: Caller<'_, HostContext>,
         kind: i32,
         key_span: i64,
         old_value_span: i64,
         new_value_span: i64|
         -> i32 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let Some(kind) = StorageKind::from_u32(kind as u32) else {
                log::warn!(
                    target: "host",
                    "ext_offchain_local_storage_compare_and_set: unknown storage kind {kind}"
                );
                return 0;
            };
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                0,
                "ext_offchain_local_storage_compare_and_set: reading key"
            );
            let old_value = host_try!(
                mem::read_span(&memory, &caller, old_value_span.into()),
                0,
                "ext_offchain_local_storage_compare_and_set: reading old value"
            );
            let new_value = host_try!(
                mem::read_span(&memory, &caller, new_value_span.into()),
                0,
                "ext_offchain_local_storage_compare_and_set: reading new value"
            );

            let stored = caller.data().node_storage.kind(kind).get(&key);
            match stored {
                Some(stored) if stored == old_value => {
                    // The write always lands in Local storage, whatever the
                    // kind argument selected for the read.
                    caller.data().node_storage.local.put(key, new_value);
                    1
                }
                Some(_) => 0,
                None => {
                    log::debug!(
                        target: "host",
                        "compare_and_set: no stored value for key 0x{}",
                        hex::encode(&key)
                    );
                    0
                }
            }
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_is_validator_version_1",
        |caller: Caller<'_, HostContext>| -> i32 { caller.data().is_validator as i32 },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_network_state_version_1",
        |mut caller: Caller<'_, HostContext>| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let Some(network) = caller.data().network.clone() else {
                return 0;
            };
            let encoded = network.network_state().encode();
            let out = host_try!(
                mem::write_owned(&memory, &mut caller, &encoded),
                0,
                "ext_offchain_network_state: writing state"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_random_seed_version_1",
        |mut caller: Caller<'_, HostContext>| -> i32 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let mut seed = [0u8; 32];
            rand::rngs::OsRng.fill_bytes(&mut seed);
            let ptr = host_try!(
                mem::write_sized(&memory, &mut caller, &seed),
                0,
                "ext_offchain_random_seed: writing seed"
            );
            ptr as i32
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_submit_transaction_version_1",
        |mut caller: Caller<'_, HostContext>, data_span: i64| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let data = host_try!(
                mem::read_span(&memory, &caller, data_span.into()),
                0,
                "ext_offchain_submit_transaction: reading data"
            );
            let extrinsic = match Vec::<u8>::decode(&mut &data[..]) {
                Ok(extrinsic) => extrinsic,
                Err(err) => {
                    log::error!(target: "host", "failed to decode extrinsic data: {err}");
                    Vec::new()
                }
            };

            caller
                .data()
                .transaction_pool
                .add_to_pool(ValidTransaction::new(
                    extrinsic,
                    TransactionValidity::minimal(),
                ));

            let out = host_try!(
                mem::write_option(&memory, &mut caller, None),
                0,
                "ext_offchain_submit_transaction: writing result"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_timestamp_version_1",
        |_caller: Caller<'_, HostContext>| -> i64 { (unix_millis() / 1000) as i64 },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_sleep_until_version_1",
        |_caller: Caller<'_, HostContext>, deadline: i64| {
            let now = unix_millis();
            let deadline = deadline as u64;
            if deadline > now {
                std::thread::sleep(std::time::Duration::from_millis(deadline - now));
            }
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_http_request_start_version_1",
        |mut caller: Caller<'_, HostContext>,
         method_span: i64,
         uri_span: i64,
         _meta_span: i64|
         -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let method = host_try!(
                mem::read_span(&memory, &caller, method_span.into()),
                0,
                "ext_offchain_http_request_start: reading method"
            );
            let uri = host_try!(
                mem::read_span(&memory, &caller, uri_span.into()),
                0,
                "ext_offchain_http_request_start: reading uri"
            );
            let method = String::from_utf8_lossy(&method).into_owned();
            let uri = String::from_utf8_lossy(&uri).into_owned();

            let envelope = match caller.data().http.start_request(&method, &uri) {
                Ok(id) => Ok(id.to_le_bytes().to_vec()),
                Err(err) => {
                    log::error!(target: "host", "failed to start request: {err}");
                    Err(())
                }
            };
            let out = host_try!(
                mem::write_result(
                    &memory,
                    &mut caller,
                    envelope.as_ref().map(|v| v.as_slice()).map_err(|_| &[][..])
                ),
                0,
                "ext_offchain_http_request_start: writing result"
            );
            out.as_i64()
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_offchain_http_request_add_header_version_1",
        |mut caller: Caller<'_, HostContext>,
         request_id: i32,
         name_span: i64,
         value_span: i64|
         -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let name = host_try!(
                mem::read_span(&memory, &caller, name_span.into()),
                0,
                "ext_offchain_http_request_add_header: reading name"
            );
            let value = host_try!(
                mem::read_span(&memory, &caller, value_span.into()),
                0,
                "ext_offchain_http_request_add_header: reading value"
            );
            let name = String::from_utf8_lossy(&name).into_owned();
            let value = String::from_utf8_lossy(&value).into_owned();

            let envelope = match caller
                .data()
                .http
                .add_header(request_id as i16, &name, &value)
            {
                Ok(()) => Ok(()),
                Err(err) => {
                    log::error!(target: "host", "failed to add request header: {err}");
                    Err(())
                }
            };
            let out = host_try!(
                mem::write_result(
                    &memory,
                    &mut caller,
                    envelope.map(|_| &[][..]).map_err(|_| &[][..])
                ),
                0,
                "ext_offchain_http_request_add_header: writing result"
            );
            out.as_i64()
        },
    )?;

    Ok(())
}
