//! Runtime module validation.
//!
//! Checks a compiled module against the host ABI before instantiation:
//! a linear memory must be exported, and all function imports must come
//! from the `env` module the dispatch table registers under.

use wasmtime::{ExternType, Module};

use crate::error::HostError;
use crate::imports::MODULE;

/// Validate a runtime module against the host ABI.
pub fn validate_module(module: &Module) -> Result<(), HostError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == "memory" && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(HostError::Validation(
            "runtime must export its linear memory as `memory`".into(),
        ));
    }

    for import in module.imports() {
        if import.module() != MODULE {
            return Err(HostError::Validation(format!(
                "unexpected import module `{}` for `{}`",
                import.module(),
                import.name()
            )));
        }
    }

    Ok(())
}
