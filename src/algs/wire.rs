//! Byte views of typed buffers and little-endian element stamps.
//!
//! Transpose plans move opaque elements of a fixed byte size. Typed callers
//! go through [`as_bytes`] and [`as_bytes_mut`]; tools that need to recognise
//! an element after it has travelled stamp it with its global index in
//! little-endian order, truncated to the element size.

use crate::decomp_error::DecompError;
use bytemuck::Pod;
use std::mem::size_of;

pub fn as_bytes<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn as_bytes_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// `T` must have exactly the element size a plan was built for.
pub fn expect_element_type<T: Pod>(op: &'static str, element_size: usize) -> Result<(), DecompError> {
    if size_of::<T>() == element_size {
        return Ok(());
    }
    Err(crate::topology::validation::reject(DecompError::invalid(
        op,
        "T",
        format!(
            "element type of {} bytes used with a plan for {element_size}-byte elements",
            size_of::<T>()
        ),
    )))
}

/// Write `index` into `elem`, little-endian, dropping bytes that do not fit
/// and zero-filling the rest.
pub fn stamp_index(elem: &mut [u8], index: u64) {
    let le = index.to_le_bytes();
    let n = elem.len().min(le.len());
    elem[..n].copy_from_slice(&le[..n]);
    elem[n..].fill(0);
}

/// Inverse of [`stamp_index`] for the bytes that were kept.
pub fn read_index(elem: &[u8]) -> u64 {
    let mut le = [0u8; 8];
    let n = elem.len().min(le.len());
    le[..n].copy_from_slice(&elem[..n]);
    u64::from_le_bytes(le)
}

/// `index` as it survives a round trip through an `element_size`-byte stamp.
pub fn truncated_index(index: u64, element_size: usize) -> u64 {
    if element_size >= 8 {
        index
    } else {
        index & ((1u64 << (8 * element_size)) - 1)
    }
}
