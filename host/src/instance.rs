//! Runtime instance management.
//!
//! `Runtime` compiles and validates a Wasm blob once; each entry-point
//! call gets a fresh store, a fresh import registration and a fresh
//! allocator, so instances never share mutable state. Entry points follow
//! the runtime ABI: they take `(ptr, len)` of their SCALE-encoded argument
//! and return a packed pointer-size designating the result bytes.

use wasmtime::{Config, Engine, Linker, Module, Store, Val};

use crate::allocator::FreeingBumpHeapAllocator;
use crate::context::HostContext;
use crate::error::HostError;
use crate::imports::register_host_functions;
use crate::mem::PointerSize;
use crate::validation::validate_module;

/// Instance construction parameters.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    /// Pages (64 KiB each) grown on top of the runtime's own memory to
    /// serve host-side allocations.
    pub heap_pages: u64,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self { heap_pages: 64 }
    }
}

/// A compiled and validated runtime ready to execute entry points.
pub struct Runtime {
    engine: Engine,
    module: Module,
    config: InstanceConfig,
}

impl Runtime {
    /// Compile and validate a runtime blob (Wasm binary or WAT text).
    pub fn new(code: &[u8], config: InstanceConfig) -> Result<Self, HostError> {
        let engine = create_engine()?;
        let module = Module::new(&engine, code)?;
        validate_module(&module)?;
        Ok(Self {
            engine,
            module,
            config,
        })
    }

    /// Call an entry point with the given context and SCALE-encoded data.
    ///
    /// Returns the result bytes designated by the returned pointer-size and
    /// hands the context back for inspection or reuse.
    pub fn call(
        &self,
        context: HostContext,
        entry: &str,
        data: &[u8],
    ) -> Result<(Vec<u8>, HostContext), HostError> {
        let mut store = Store::new(&self.engine, context);

        let mut linker = Linker::new(&self.engine);
        register_host_functions(&mut linker)?;
        let instance = linker.instantiate(&mut store, &self.module)?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| HostError::Memory("runtime has no memory export".into()))?;

        // The host heap starts at the runtime's `__heap_base`, or at the end
        // of the initial memory when the global is absent, and covers the
        // extra pages grown here.
        let heap_base = match instance
            .get_global(&mut store, "__heap_base")
            .map(|global| global.get(&mut store))
        {
            Some(Val::I32(base)) => base as u32,
            _ => memory.data_size(&store) as u32,
        };
        memory.grow(&mut store, self.config.heap_pages)?;
        store.data_mut().allocator = FreeingBumpHeapAllocator::new(heap_base);

        let input_span = {
            let mut allocator = std::mem::take(&mut store.data_mut().allocator);
            let result = allocator.allocate_and_write(memory.data_mut(&mut store), data);
            store.data_mut().allocator = allocator;
            result?
        };

        let entry_fn = instance.get_typed_func::<(i32, i32), i64>(&mut store, entry)?;
        let returned = entry_fn.call(
            &mut store,
            (input_span.pointer() as i32, input_span.length() as i32),
        )?;

        let span = PointerSize::from(returned);
        let output = {
            let mem = memory.data(&store);
            let start = span.pointer() as usize;
            let end = start + span.length() as usize;
            mem.get(start..end)
                .ok_or_else(|| HostError::InvalidReturn(entry.to_string()))?
                .to_vec()
        };

        Ok((output, store.into_data()))
    }
}

/// Ask a runtime blob for its version by calling `Core_version` with a
/// throwaway context. The response is returned as-is (already SCALE).
pub fn runtime_version(code: &[u8]) -> Result<Vec<u8>, HostError> {
    let runtime = Runtime::new(code, InstanceConfig::default())?;
    let (version, _) = runtime.call(HostContext::with_trie_state(), "Core_version", &[])?;
    Ok(version)
}

/// Engine configuration shared by every instance: deterministic execution,
/// no threads, no SIMD, canonical NaNs.
fn create_engine() -> Result<Engine, HostError> {
    let mut config = Config::new();
    config.wasm_threads(false);
    config.wasm_simd(false);
    config.wasm_relaxed_simd(false);
    config.wasm_multi_memory(false);
    config.cranelift_nan_canonicalization(true);
    Ok(Engine::new(&config)?)
}
