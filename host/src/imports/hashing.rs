//! `ext_hashing_*` imports.
//!
//! Each import hashes the given span and returns a pointer to a freshly
//! allocated digest of the algorithm's natural length.

use wasmtime::{Caller, Linker};

use filament_primitives::hashing;

use crate::context::HostContext;
use crate::error::HostError;
use crate::mem;

use super::{host_try, memory_of, MODULE};

macro_rules! register_hash {
    ($linker:expr, $name:literal, $hash:path) => {
        $linker.func_wrap(
            MODULE,
            $name,
            |mut caller: Caller<'_, HostContext>, data_span: i64| -> i32 {
                let Some(memory) = memory_of(&mut caller) else {
                    return 0;
                };
                let data = host_try!(
                    mem::read_span(&memory, &caller, data_span.into()),
                    0,
                    concat!($name, ": reading data")
                );
                let digest = $hash(&data);
                let ptr = host_try!(
                    mem::write_sized(&memory, &mut caller, &digest),
                    0,
                    concat!($name, ": writing digest")
                );
                ptr as i32
            },
        )?;
    };
}

pub(super) fn register(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    register_hash!(linker, "ext_hashing_blake2_128_version_1", hashing::blake2_128);
    register_hash!(linker, "ext_hashing_blake2_256_version_1", hashing::blake2_256);
    register_hash!(linker, "ext_hashing_keccak_256_version_1", hashing::keccak_256);
    register_hash!(linker, "ext_hashing_sha2_256_version_1", hashing::sha2_256);
    register_hash!(linker, "ext_hashing_twox_64_version_1", hashing::twox_64);
    register_hash!(linker, "ext_hashing_twox_128_version_1", hashing::twox_128);
    register_hash!(linker, "ext_hashing_twox_256_version_1", hashing::twox_256);
    Ok(())
}
