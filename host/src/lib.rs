//! `filament-host` — the Wasm host-function layer of the Filament node.
//!
//! A runtime blob imports a fixed set of `ext_*` host functions; this crate
//! implements them over wasmtime. It provides:
//!
//! - the freeing-bump allocator serving `ext_allocator_{malloc,free}`
//! - the memory marshalling ABI (`PointerSize`, span and envelope helpers)
//! - `HostContext`, the per-instance execution context
//! - the import dispatch table registered on the linker
//! - `Runtime`, compiling and calling runtime entry points
//!
//! Failure discipline: recoverable errors inside a host call are logged and
//! translated to the in-band sentinel the runtime expects; only allocator
//! exhaustion and unrecoverable invariant violations trap the instance.

pub mod allocator;
pub mod context;
pub mod error;
pub mod imports;
pub mod instance;
pub mod mem;
pub mod validation;

pub use allocator::FreeingBumpHeapAllocator;
pub use context::HostContext;
pub use error::HostError;
pub use imports::register_host_functions;
pub use instance::{runtime_version, InstanceConfig, Runtime};
pub use mem::PointerSize;
