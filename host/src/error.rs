//! Host-layer error types.

use crate::allocator::AllocatorError;

/// Top-level error type for instance management and entry-point calls.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Wasmtime engine, compilation or instantiation error.
    #[error("wasmtime error: {0}")]
    Wasmtime(#[from] anyhow::Error),

    /// Module validation failed (missing exports, bad signatures).
    #[error("validation error: {0}")]
    Validation(String),

    /// Linear memory access or layout failure.
    #[error("memory error: {0}")]
    Memory(String),

    /// Heap allocation failure.
    #[error("allocator error: {0}")]
    Allocator(#[from] AllocatorError),

    /// The entry point returned something other than a packed pointer-size.
    #[error("entry point `{0}` returned an invalid value")]
    InvalidReturn(String),
}
