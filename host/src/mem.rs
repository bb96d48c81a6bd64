//! The Wasm memory marshalling ABI.
//!
//! Variable-length data crosses the host boundary as a [`PointerSize`]: a
//! single 64-bit scalar packing a 32-bit pointer (low half) and a 32-bit
//! byte length (high half). The helpers here read spans out of the linear
//! memory and write allocator-owned results back, in the envelope shapes
//! the runtime expects (raw, option, fixed-size option, result).

use wasmtime::{Caller, Extern, Memory};

use filament_primitives::codec;

use crate::allocator::AllocatorError;
use crate::context::HostContext;

/// A packed pointer + length pair, the 64-bit currency of the host ABI.
///
/// The zero value encodes the empty slice at pointer 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerSize(u64);

impl PointerSize {
    pub fn new(pointer: u32, length: u32) -> Self {
        Self((length as u64) << 32 | pointer as u64)
    }

    pub fn pointer(self) -> u32 {
        self.0 as u32
    }

    pub fn length(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

impl From<i64> for PointerSize {
    fn from(value: i64) -> Self {
        Self(value as u64)
    }
}

/// Memory access failure, translated to an in-band sentinel by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("span [{0}, {0}+{1}) is out of linear memory bounds")]
    OutOfBounds(u32, u32),
    #[error(transparent)]
    Allocator(#[from] AllocatorError),
}

/// The guest's exported linear memory, if any.
pub fn exported_memory(caller: &mut Caller<'_, HostContext>) -> Option<Memory> {
    match caller.get_export("memory") {
        Some(Extern::Memory(memory)) => Some(memory),
        _ => None,
    }
}

/// Read `len` bytes at `ptr`.
pub fn read_bytes(
    memory: &Memory,
    caller: &Caller<'_, HostContext>,
    ptr: u32,
    len: u32,
) -> Result<Vec<u8>, MemoryError> {
    let data = memory.data(caller);
    let start = ptr as usize;
    let end = start
        .checked_add(len as usize)
        .ok_or(MemoryError::OutOfBounds(ptr, len))?;
    if end > data.len() {
        return Err(MemoryError::OutOfBounds(ptr, len));
    }
    Ok(data[start..end].to_vec())
}

/// Read the span a packed pointer-size designates.
pub fn read_span(
    memory: &Memory,
    caller: &Caller<'_, HostContext>,
    span: PointerSize,
) -> Result<Vec<u8>, MemoryError> {
    read_bytes(memory, caller, span.pointer(), span.length())
}

/// Read a fixed-width array at `ptr`.
pub fn read_array<const N: usize>(
    memory: &Memory,
    caller: &Caller<'_, HostContext>,
    ptr: u32,
) -> Result<[u8; N], MemoryError> {
    let bytes = read_bytes(memory, caller, ptr, N as u32)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Copy `data` to `ptr`, bounds-checked.
pub fn write_bytes(
    memory: &Memory,
    caller: &mut Caller<'_, HostContext>,
    ptr: u32,
    data: &[u8],
) -> Result<(), MemoryError> {
    let mem = memory.data_mut(caller);
    let start = ptr as usize;
    let end = start
        .checked_add(data.len())
        .ok_or(MemoryError::OutOfBounds(ptr, data.len() as u32))?;
    if end > mem.len() {
        return Err(MemoryError::OutOfBounds(ptr, data.len() as u32));
    }
    mem[start..end].copy_from_slice(data);
    Ok(())
}

/// Allocate `size` bytes from the instance heap.
pub fn allocate(
    memory: &Memory,
    caller: &mut Caller<'_, HostContext>,
    size: u32,
) -> Result<u32, AllocatorError> {
    // The allocator is moved out of the context while it works on the
    // memory view, since both live behind the caller.
    let mut allocator = std::mem::take(&mut caller.data_mut().allocator);
    let result = allocator.allocate(memory.data_mut(&mut *caller), size);
    caller.data_mut().allocator = allocator;
    result
}

/// Return a region to the instance heap.
pub fn deallocate(
    memory: &Memory,
    caller: &mut Caller<'_, HostContext>,
    ptr: u32,
) -> Result<(), AllocatorError> {
    let mut allocator = std::mem::take(&mut caller.data_mut().allocator);
    let result = allocator.deallocate(memory.data_mut(&mut *caller), ptr);
    caller.data_mut().allocator = allocator;
    result
}

/// Copy `data` into freshly allocated memory, returning the packed span.
pub fn write_owned(
    memory: &Memory,
    caller: &mut Caller<'_, HostContext>,
    data: &[u8],
) -> Result<PointerSize, MemoryError> {
    let ptr = allocate(memory, caller, data.len() as u32)?;
    write_bytes(memory, caller, ptr, data)?;
    Ok(PointerSize::new(ptr, data.len() as u32))
}

/// Copy `data` into freshly allocated memory, returning only the pointer.
/// Used when the callee's type implies the length (hashes, public keys).
pub fn write_sized(
    memory: &Memory,
    caller: &mut Caller<'_, HostContext>,
    data: &[u8],
) -> Result<u32, MemoryError> {
    let ptr = allocate(memory, caller, data.len() as u32)?;
    write_bytes(memory, caller, ptr, data)?;
    Ok(ptr)
}

/// Write an `Option<bytes>` envelope (`0x00`, or `0x01` + compact length +
/// bytes).
pub fn write_option(
    memory: &Memory,
    caller: &mut Caller<'_, HostContext>,
    value: Option<&[u8]>,
) -> Result<PointerSize, MemoryError> {
    write_owned(memory, caller, &codec::encode_option_bytes(value))
}

/// Write a fixed-size option envelope (`0x00`, or `0x01` + raw bytes).
pub fn write_option_fixed(
    memory: &Memory,
    caller: &mut Caller<'_, HostContext>,
    value: Option<&[u8]>,
) -> Result<PointerSize, MemoryError> {
    write_owned(memory, caller, &codec::encode_option_fixed(value))
}

/// Write an `Option<u32>` envelope with a little-endian payload.
pub fn write_option_u32(
    memory: &Memory,
    caller: &mut Caller<'_, HostContext>,
    value: Option<u32>,
) -> Result<PointerSize, MemoryError> {
    write_owned(memory, caller, &codec::encode_option_u32(value))
}

/// Write a `Result` envelope; payloads must already be encoded.
pub fn write_result(
    memory: &Memory,
    caller: &mut Caller<'_, HostContext>,
    result: Result<&[u8], &[u8]>,
) -> Result<PointerSize, MemoryError> {
    write_owned(memory, caller, &codec::encode_result(result))
}
