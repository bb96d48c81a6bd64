//! `ext_misc_*` imports: runtime printing and version introspection.

use wasmtime::{Caller, Linker};

use crate::context::HostContext;
use crate::error::HostError;
use crate::instance;
use crate::mem;

use super::{host_try, memory_of, MODULE};

pub(super) fn register(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    linker.func_wrap(
        MODULE,
        "ext_misc_print_hex_version_1",
        |mut caller: Caller<'_, HostContext>, data_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let data = host_try!(
                mem::read_span(&memory, &caller, data_span.into()),
                (),
                "ext_misc_print_hex: reading data"
            );
            log::debug!(target: "runtime", "0x{}", hex::encode(data));
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_misc_print_num_version_1",
        |_caller: Caller<'_, HostContext>, value: i64| {
            log::debug!(target: "runtime", "{value}");
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_misc_print_utf8_version_1",
        |mut caller: Caller<'_, HostContext>, data_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let data = host_try!(
                mem::read_span(&memory, &caller, data_span.into()),
                (),
                "ext_misc_print_utf8: reading data"
            );
            log::debug!(target: "runtime", "{}", String::from_utf8_lossy(&data));
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_misc_runtime_version_version_1",
        |mut caller: Caller<'_, HostContext>, code_span: i64| -> i64 {
            let Some(memory) = memory_of(&mut caller) else {
                return 0;
            };
            let code = host_try!(
                mem::read_span(&memory, &caller, code_span.into()),
                0,
                "ext_misc_runtime_version: reading code"
            );

            // Instantiate the supplied blob with a throwaway context and ask
            // it for its version; the response is already SCALE-encoded.
            let version = match instance::runtime_version(&code) {
                Ok(version) => Some(version),
                Err(err) => {
                    log::error!(target: "host", "failed to get runtime version: {err}");
                    None
                }
            };
            let out = host_try!(
                mem::write_option(&memory, &mut caller, version.as_deref()),
                0,
                "ext_misc_runtime_version: writing version"
            );
            out.as_i64()
        },
    )?;

    Ok(())
}
