//! `ext_trie_*` imports: transient trie roots and proof verification.

use codec::Decode;
use wasmtime::{Caller, Linker};

use filament_primitives::trie::{proof, Trie};

use crate::context::HostContext;
use crate::error::HostError;
use crate::mem;

use super::{host_try, memory_of, MODULE};

fn pairs_root(caller: &mut Caller<'_, HostContext>, data_span: i64) -> i32 {
    let Some(memory) = memory_of(caller) else {
        return 0;
    };
    let data = host_try!(
        mem::read_span(&memory, caller, data_span.into()),
        0,
        "ext_trie_blake2_256_root: reading data"
    );

    // The span is a SCALE vector of (key, value) tuples.
    let pairs = host_try!(
        Vec::<(Vec<u8>, Vec<u8>)>::decode(&mut &data[..]),
        0,
        "ext_trie_blake2_256_root: decoding key/value pairs"
    );

    let root = Trie::from_pairs(&pairs).root_hash();
    log::debug!(target: "host", "trie root is 0x{}", hex::encode(root));
    let ptr = host_try!(
        mem::write_sized(&memory, caller, &root),
        0,
        "ext_trie_blake2_256_root: writing root"
    );
    ptr as i32
}

fn ordered_root(caller: &mut Caller<'_, HostContext>, data_span: i64) -> i32 {
    let Some(memory) = memory_of(caller) else {
        return 0;
    };
    let data = host_try!(
        mem::read_span(&memory, caller, data_span.into()),
        0,
        "ext_trie_blake2_256_ordered_root: reading data"
    );

    let values = host_try!(
        Vec::<Vec<u8>>::decode(&mut &data[..]),
        0,
        "ext_trie_blake2_256_ordered_root: decoding values"
    );

    let root = Trie::from_ordered_values(&values).root_hash();
    log::debug!(target: "host", "ordered trie root is 0x{}", hex::encode(root));
    let ptr = host_try!(
        mem::write_sized(&memory, caller, &root),
        0,
        "ext_trie_blake2_256_ordered_root: writing root"
    );
    ptr as i32
}

pub(super) fn register(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    linker.func_wrap(
        MODULE,
        "ext_trie_blake2_256_root_version_1",
        |mut caller: Caller<'_, HostContext>, data_span: i64| -> i32 {
            pairs_root(&mut caller, data_span)
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_trie_blake2_256_root_version_2",
        |mut caller: Caller<'_, HostContext>, data_span: i64, _state_version: i32| -> i32 {
            pairs_root(&mut caller, data_span)
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_trie_blake2_256_ordered_root_version_1",
        |mut caller: Caller<'_, HostContext>, data_span: i64| -> i32 {
            ordered_root(&mut caller, data_span)
        },
    )?;
    linker.func_wrap(
        MODULE,
        "ext_trie_blake2_256_ordered_root_version_2",
        |mut caller: Caller<'_, HostContext>, data_span: i64, _state_version: i32| -> i32 {
            ordered_root(&mut caller, data_span)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_trie_blake2_256_verify_proof_version_1",
        |mut caller: Caller<'_, HostContext>,
         root_ptr: i32,
         proof_span: i64,
         key_span: i64,
         value_span: i64|
         -> i32 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let root: [u8; 32] = host_try!(
                mem::read_array(&memory, &caller, root_ptr as u32),
                0,
                "ext_trie_blake2_256_verify_proof: reading root"
            );
            let proof = host_try!(
                mem::read_span(&memory, &caller, proof_span.into()),
                0,
                "ext_trie_blake2_256_verify_proof: reading proof"
            );
            let key = host_try!(
                mem::read_span(&memory, &caller, key_span.into()),
                0,
                "ext_trie_blake2_256_verify_proof: reading key"
            );
            let value = host_try!(
                mem::read_span(&memory, &caller, value_span.into()),
                0,
                "ext_trie_blake2_256_verify_proof: reading value"
            );

            match proof::verify_encoded(&proof, &root, &key, &value) {
                Ok(()) => 1,
                Err(err) => {
                    log::error!(target: "host", "failed proof verification: {err}");
                    0
                }
            }
        },
    )?;

    Ok(())
}
