//! `ext_logging_*` imports.

use wasmtime::{Caller, Linker};

use crate::context::HostContext;
use crate::error::HostError;
use crate::mem;

use super::{host_try, memory_of, MODULE};

pub(super) fn register(linker: &mut Linker<HostContext>) -> Result<(), HostError> {
    linker.func_wrap(
        MODULE,
        "ext_logging_log_version_1",
        |mut caller: Caller<'_, HostContext>, level: i32, target_span: i64, message_span: i64| {
            let Some(memory) = memory_of(&mut caller) else {
                return;
            };
            let target = host_try!(
                mem::read_span(&memory, &caller, target_span.into()),
                (),
                "ext_logging_log: reading target"
            );
            let message = host_try!(
                mem::read_span(&memory, &caller, message_span.into()),
                (),
                "ext_logging_log: reading message"
            );
            let target = String::from_utf8_lossy(&target);
            let message = String::from_utf8_lossy(&message);

            match level {
                0 => log::error!(target: "runtime", "target={target} message={message}"),
                1 => log::warn!(target: "runtime", "target={target} message={message}"),
                2 => log::info!(target: "runtime", "target={target} message={message}"),
                3 => log::debug!(target: "runtime", "target={target} message={message}"),
                4 => log::trace!(target: "runtime", "target={target} message={message}"),
                _ => {
                    log::error!(target: "runtime", "level={level} target={target} message={message}")
                }
            }
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ext_logging_max_level_version_1",
        |_caller: Caller<'_, HostContext>| -> i32 {
            // Trace; the facade filters on the node side.
            4
        },
    )?;

    Ok(())
}
