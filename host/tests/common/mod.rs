//! Shared test harness for host-function integration tests.
//!
//! Builds a WAT guest module that imports the host functions under test and
//! re-exports a trampoline for each, so tests drive the real linker through
//! real Wasm calls. Inputs are staged into guest memory through the host
//! allocator, exactly as runtime-owned buffers would be.

#![allow(dead_code)]

use wasmtime::{Engine, Linker, Memory, Module, Store};

use filament_host::allocator::FreeingBumpHeapAllocator;
use filament_host::{register_host_functions, HostContext, PointerSize};

/// Imported host functions and their trampoline exports:
/// `(import name, export name, params, results)`.
const HARNESS_FUNCTIONS: &[(&str, &str, &str, &str)] = &[
    // logging
    ("ext_logging_log_version_1", "log", "i32 i64 i64", ""),
    ("ext_logging_max_level_version_1", "log_max_level", "", "i32"),
    // hashing
    ("ext_hashing_blake2_128_version_1", "blake2_128", "i64", "i32"),
    ("ext_hashing_blake2_256_version_1", "blake2_256", "i64", "i32"),
    ("ext_hashing_keccak_256_version_1", "keccak_256", "i64", "i32"),
    ("ext_hashing_sha2_256_version_1", "sha2_256", "i64", "i32"),
    ("ext_hashing_twox_64_version_1", "twox_64", "i64", "i32"),
    ("ext_hashing_twox_128_version_1", "twox_128", "i64", "i32"),
    ("ext_hashing_twox_256_version_1", "twox_256", "i64", "i32"),
    // crypto
    ("ext_crypto_ed25519_generate_version_1", "ed25519_generate", "i32 i64", "i32"),
    ("ext_crypto_ed25519_public_keys_version_1", "ed25519_public_keys", "i32", "i64"),
    ("ext_crypto_ed25519_sign_version_1", "ed25519_sign", "i32 i32 i64", "i64"),
    ("ext_crypto_ed25519_verify_version_1", "ed25519_verify", "i32 i64 i32", "i32"),
    ("ext_crypto_sr25519_generate_version_1", "sr25519_generate", "i32 i64", "i32"),
    ("ext_crypto_sr25519_public_keys_version_1", "sr25519_public_keys", "i32", "i64"),
    ("ext_crypto_sr25519_sign_version_1", "sr25519_sign", "i32 i32 i64", "i64"),
    ("ext_crypto_sr25519_verify_version_1", "sr25519_verify_v1", "i32 i64 i32", "i32"),
    ("ext_crypto_sr25519_verify_version_2", "sr25519_verify_v2", "i32 i64 i32", "i32"),
    ("ext_crypto_secp256k1_ecdsa_recover_version_1", "ecdsa_recover", "i32 i32", "i64"),
    (
        "ext_crypto_secp256k1_ecdsa_recover_compressed_version_1",
        "ecdsa_recover_compressed",
        "i32 i32",
        "i64",
    ),
    ("ext_crypto_ecdsa_verify_version_2", "ecdsa_verify_v2", "i32 i64 i32", "i32"),
    ("ext_crypto_start_batch_verify_version_1", "start_batch_verify", "", ""),
    ("ext_crypto_finish_batch_verify_version_1", "finish_batch_verify", "", "i32"),
    // trie
    ("ext_trie_blake2_256_root_version_1", "trie_root", "i64", "i32"),
    ("ext_trie_blake2_256_ordered_root_version_1", "trie_ordered_root", "i64", "i32"),
    (
        "ext_trie_blake2_256_verify_proof_version_1",
        "trie_verify_proof",
        "i32 i64 i64 i64",
        "i32",
    ),
    // storage
    ("ext_storage_set_version_1", "storage_set", "i64 i64", ""),
    ("ext_storage_get_version_1", "storage_get", "i64", "i64"),
    ("ext_storage_read_version_1", "storage_read", "i64 i64 i32", "i64"),
    ("ext_storage_clear_version_1", "storage_clear", "i64", ""),
    ("ext_storage_exists_version_1", "storage_exists", "i64", "i32"),
    ("ext_storage_next_key_version_1", "storage_next_key", "i64", "i64"),
    ("ext_storage_append_version_1", "storage_append", "i64 i64", ""),
    ("ext_storage_root_version_1", "storage_root", "", "i64"),
    ("ext_storage_changes_root_version_1", "storage_changes_root", "i64", "i64"),
    ("ext_storage_clear_prefix_version_1", "storage_clear_prefix", "i64", ""),
    ("ext_storage_clear_prefix_version_2", "storage_clear_prefix_v2", "i64 i64", "i64"),
    ("ext_storage_start_transaction_version_1", "storage_start_transaction", "", ""),
    ("ext_storage_commit_transaction_version_1", "storage_commit_transaction", "", ""),
    (
        "ext_storage_rollback_transaction_version_1",
        "storage_rollback_transaction",
        "",
        "",
    ),
    // child storage
    ("ext_default_child_storage_set_version_1", "child_set", "i64 i64 i64", ""),
    ("ext_default_child_storage_get_version_1", "child_get", "i64 i64", "i64"),
    ("ext_default_child_storage_read_version_1", "child_read", "i64 i64 i64 i32", "i64"),
    ("ext_default_child_storage_clear_version_1", "child_clear", "i64 i64", ""),
    ("ext_default_child_storage_exists_version_1", "child_exists", "i64 i64", "i32"),
    ("ext_default_child_storage_next_key_version_1", "child_next_key", "i64 i64", "i64"),
    ("ext_default_child_storage_root_version_1", "child_root", "i64", "i64"),
    ("ext_default_child_storage_storage_kill_version_1", "child_kill", "i64", ""),
    ("ext_default_child_storage_storage_kill_version_2", "child_kill_v2", "i64 i64", "i32"),
    ("ext_default_child_storage_storage_kill_version_3", "child_kill_v3", "i64 i64", "i64"),
    // offchain
    ("ext_offchain_is_validator_version_1", "is_validator", "", "i32"),
    ("ext_offchain_random_seed_version_1", "random_seed", "", "i32"),
    ("ext_offchain_timestamp_version_1", "timestamp", "", "i64"),
    ("ext_offchain_index_set_version_1", "index_set", "i64 i64", ""),
    ("ext_offchain_local_storage_set_version_1", "local_storage_set", "i32 i64 i64", ""),
    ("ext_offchain_local_storage_get_version_1", "local_storage_get", "i32 i64", "i64"),
    ("ext_offchain_local_storage_clear_version_1", "local_storage_clear", "i32 i64", ""),
    (
        "ext_offchain_local_storage_compare_and_set_version_1",
        "local_storage_compare_and_set",
        "i32 i64 i64 i64",
        "i32",
    ),
    ("ext_offchain_submit_transaction_version_1", "submit_transaction", "i64", "i64"),
    ("ext_offchain_network_state_version_1", "network_state", "", "i64"),
    ("ext_offchain_http_request_start_version_1", "http_request_start", "i64 i64 i64", "i64"),
    (
        "ext_offchain_http_request_add_header_version_1",
        "http_request_add_header",
        "i32 i64 i64",
        "i64",
    ),
    // misc
    ("ext_misc_print_utf8_version_1", "print_utf8", "i64", ""),
    ("ext_misc_runtime_version_version_1", "runtime_version", "i64", "i64"),
    // allocator
    ("ext_allocator_malloc_version_1", "malloc", "i32", "i32"),
    ("ext_allocator_free_version_1", "free", "i32", ""),
    // stubs stay linkable
    ("ext_transaction_index_index_version_1", "transaction_index", "i32 i32 i32", ""),
    ("ext_sandbox_instantiate_version_1", "sandbox_instantiate", "i32 i64 i64 i32", "i32"),
];

/// Pages of guest memory in the harness module.
const MEMORY_PAGES: u32 = 32;

/// Build the harness module: one import plus one trampoline per entry.
fn harness_wat() -> String {
    let mut wat = String::from("(module\n");

    for (index, (import, _, params, results)) in HARNESS_FUNCTIONS.iter().enumerate() {
        let param_clause = if params.is_empty() {
            String::new()
        } else {
            format!(" (param {params})")
        };
        let result_clause = if results.is_empty() {
            String::new()
        } else {
            format!(" (result {results})")
        };
        wat.push_str(&format!(
            "  (import \"env\" \"{import}\" (func $f{index}{param_clause}{result_clause}))\n"
        ));
    }

    wat.push_str(&format!("  (memory (export \"memory\") {MEMORY_PAGES})\n"));

    for (index, (_, export, params, results)) in HARNESS_FUNCTIONS.iter().enumerate() {
        let param_clause = if params.is_empty() {
            String::new()
        } else {
            format!(" (param {params})")
        };
        let result_clause = if results.is_empty() {
            String::new()
        } else {
            format!(" (result {results})")
        };
        let mut body = String::new();
        for (arg, _) in params.split_whitespace().enumerate() {
            body.push_str(&format!(" local.get {arg}"));
        }
        wat.push_str(&format!(
            "  (func (export \"{export}\"){param_clause}{result_clause}{body} call $f{index})\n"
        ));
    }

    wat.push(')');
    wat
}

/// A live harness instance wrapping a store, its memory and the guest.
pub struct TestInstance {
    pub store: Store<HostContext>,
    pub memory: Memory,
    instance: wasmtime::Instance,
}

impl TestInstance {
    pub fn new() -> Self {
        Self::with_context(HostContext::with_trie_state())
    }

    pub fn with_context(context: HostContext) -> Self {
        let engine = Engine::default();
        let module = Module::new(&engine, harness_wat()).expect("harness module must compile");
        let mut linker = Linker::new(&engine);
        register_host_functions(&mut linker).expect("host functions must register");

        let mut store = Store::new(&engine, context);
        let instance = linker
            .instantiate(&mut store, &module)
            .expect("harness module must instantiate");
        let memory = instance
            .get_memory(&mut store, "memory")
            .expect("harness exports its memory");

        // The heap covers the upper half of the harness memory; the lower
        // half stays untouched for the module itself.
        let heap_base = MEMORY_PAGES / 2 * 65_536;
        store.data_mut().allocator = FreeingBumpHeapAllocator::new(heap_base);

        Self {
            store,
            memory,
            instance,
        }
    }

    /// Stage bytes into allocator-owned guest memory.
    pub fn write(&mut self, data: &[u8]) -> PointerSize {
        let mut allocator = std::mem::take(&mut self.store.data_mut().allocator);
        let span = allocator
            .allocate_and_write(self.memory.data_mut(&mut self.store), data)
            .expect("harness heap must not run out");
        self.store.data_mut().allocator = allocator;
        span
    }

    /// Stage bytes and return the packed span as the ABI scalar.
    pub fn write_span(&mut self, data: &[u8]) -> i64 {
        self.write(data).as_i64()
    }

    /// Stage bytes and return only the pointer.
    pub fn write_ptr(&mut self, data: &[u8]) -> i32 {
        self.write(data).pointer() as i32
    }

    pub fn read(&self, ptr: u32, len: u32) -> Vec<u8> {
        let data = self.memory.data(&self.store);
        data[ptr as usize..(ptr + len) as usize].to_vec()
    }

    pub fn read_span(&self, span: i64) -> Vec<u8> {
        let span = PointerSize::from(span);
        self.read(span.pointer(), span.length())
    }

    /// Call a trampoline export through the Wasm boundary.
    pub fn call<P, R>(&mut self, export: &str, params: P) -> R
    where
        P: wasmtime::WasmParams,
        R: wasmtime::WasmResults,
    {
        let func = self
            .instance
            .get_typed_func::<P, R>(&mut self.store, export)
            .unwrap_or_else(|err| panic!("missing harness export `{export}`: {err}"));
        func.call(&mut self.store, params)
            .unwrap_or_else(|err| panic!("calling `{export}` trapped: {err}"))
    }

    /// Call a trampoline export, returning the raw result for trap checks.
    pub fn try_call<P, R>(&mut self, export: &str, params: P) -> anyhow::Result<R>
    where
        P: wasmtime::WasmParams,
        R: wasmtime::WasmResults,
    {
        let func = self
            .instance
            .get_typed_func::<P, R>(&mut self.store, export)?;
        func.call(&mut self.store, params)
    }
}

/// SCALE `Option<bytes>`: `None`.
pub fn none_option() -> Vec<u8> {
    vec![0x00]
}

/// SCALE `Option<bytes>`: `Some(data)`.
pub fn some_option(data: &[u8]) -> Vec<u8> {
    use codec::Encode;
    Some(data.to_vec()).encode()
}
