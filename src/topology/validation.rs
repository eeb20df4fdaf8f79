//! Argument checks shared by every public entry point.
//!
//! Each check returns `Ok(())` when the argument is valid, or a
//! [`DecompError`] naming the operation and the argument. Rejections are
//! logged at error level before they are returned.
//!
//! Checks are independent of each other except where a table lookup needs a
//! previous check: pencil and axis legality must pass before
//! [`crate::topology::pencil`] tables are indexed.

use crate::decomp_error::DecompError;
use crate::topology::pencil::{Axis, Pencil, Rotation};
use static_assertions::const_assert;

/// Largest accepted global extent; counts are handed to 32-bit messaging APIs.
pub const GLSIZE_MAX: usize = i32::MAX as usize;

/// Element sizes must stay strictly below this many bytes.
pub const ELEMENT_SIZE_LIMIT: usize = u16::MAX as usize;

/// Largest byte count of a single message; backends pass counts as `i32`.
pub const MESSAGE_LEN_MAX: usize = i32::MAX as usize;

/// Per-axis process counts given by the user must stay strictly below this.
pub const AXIS_NPROCS_LIMIT: usize = 1 << 16;

const_assert!(GLSIZE_MAX <= isize::MAX as usize);

/// Log a rejection and hand the error back.
pub(crate) fn reject(err: DecompError) -> DecompError {
    log::error!("{err}");
    err
}

/// Slices standing in for output or input arrays must have the expected length.
pub fn check_len(
    op: &'static str,
    arg: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), DecompError> {
    if expected == found {
        return Ok(());
    }
    Err(reject(DecompError::invalid(
        op,
        arg,
        format!("expected length {expected}, got {found}"),
    )))
}

/// Only 2D and 3D domains are supported.
pub fn check_ndims(op: &'static str, ndims: usize) -> Result<(), DecompError> {
    if ndims == 2 || ndims == 3 {
        return Ok(());
    }
    Err(reject(DecompError::invalid(
        op,
        "ndims",
        format!("ndims ({ndims} is given) should be one of 2 or 3"),
    )))
}

/// 2D accepts X1 and Y1; 3D accepts all six pencils.
pub fn check_pencil(op: &'static str, ndims: usize, pencil: Pencil) -> Result<(), DecompError> {
    let valid = match ndims {
        2 => matches!(pencil, Pencil::X1 | Pencil::Y1),
        3 => true,
        _ => false,
    };
    if valid {
        return Ok(());
    }
    Err(reject(DecompError::invalid(
        op,
        "pencil",
        format!("pencil {pencil} is not defined for a {ndims}D domain"),
    )))
}

/// 2D accepts X and Y; 3D accepts X, Y and Z.
pub fn check_axis(op: &'static str, ndims: usize, axis: Axis) -> Result<(), DecompError> {
    if (axis as usize) < ndims && ndims <= 3 {
        return Ok(());
    }
    Err(reject(DecompError::invalid(
        op,
        "axis",
        format!("axis {axis} is not defined for a {ndims}D domain"),
    )))
}

/// Process counts must be positive.
pub fn check_nprocs(op: &'static str, nprocs: usize) -> Result<(), DecompError> {
    if nprocs > 0 {
        return Ok(());
    }
    Err(reject(DecompError::invalid(
        op,
        "nprocs",
        "number of processes is zero",
    )))
}

/// A rank lives inside its group.
pub fn check_rank(op: &'static str, nprocs: usize, rank: usize) -> Result<(), DecompError> {
    if rank < nprocs {
        return Ok(());
    }
    Err(reject(DecompError::invalid(
        op,
        "rank",
        format!("rank ({rank}) should be smaller than nprocs ({nprocs})"),
    )))
}

/// Global extents are bounded by [`GLSIZE_MAX`].
pub fn check_glsize(op: &'static str, glsize: usize) -> Result<(), DecompError> {
    if glsize <= GLSIZE_MAX {
        return Ok(());
    }
    Err(reject(DecompError::overflow(
        op,
        "glsize",
        format!("glsize {glsize} exceeds {GLSIZE_MAX}"),
    )))
}

/// One peer's share must fit a single message.
pub fn check_message_len(op: &'static str, arg: &'static str, len: usize) -> Result<(), DecompError> {
    if len <= MESSAGE_LEN_MAX {
        return Ok(());
    }
    Err(reject(DecompError::overflow(
        op,
        arg,
        format!("a {len}-byte message exceeds {MESSAGE_LEN_MAX} bytes"),
    )))
}

/// Element sizes are in `1..ELEMENT_SIZE_LIMIT`.
pub fn check_element_size(op: &'static str, size_of_element: usize) -> Result<(), DecompError> {
    if size_of_element == 0 {
        return Err(reject(DecompError::invalid(
            op,
            "size_of_element",
            "size_of_element is zero",
        )));
    }
    if size_of_element < ELEMENT_SIZE_LIMIT {
        return Ok(());
    }
    Err(reject(DecompError::invalid(
        op,
        "size_of_element",
        format!("size_of_element = {size_of_element} should be smaller than {ELEMENT_SIZE_LIMIT}"),
    )))
}

/// 2D rotations only swap X1 and Y1.
pub fn check_pencil_pair_2d(
    op: &'static str,
    bef: Pencil,
    aft: Pencil,
) -> Result<(), DecompError> {
    check_pencil(op, 2, bef)?;
    check_pencil(op, 2, aft)?;
    if bef != aft {
        return Ok(());
    }
    Err(reject(DecompError::invalid(
        op,
        "pencil_aft",
        format!("pair of pencil_bef ({bef}) pencil_aft ({aft}) is not valid"),
    )))
}

/// 3D rotations step once along X1 -> Y1 -> Z1 -> X2 -> Y2 -> Z2 -> X1,
/// in either direction.
pub fn check_pencil_pair_3d(
    op: &'static str,
    bef: Pencil,
    aft: Pencil,
) -> Result<Rotation, DecompError> {
    check_pencil(op, 3, bef)?;
    check_pencil(op, 3, aft)?;
    if bef.next() == aft {
        Ok(Rotation::Forward)
    } else if bef.prev() == aft {
        Ok(Rotation::Backward)
    } else {
        Err(reject(DecompError::invalid(
            op,
            "pencil_aft",
            format!("pair of pencil_bef ({bef}) pencil_aft ({aft}) is not valid"),
        )))
    }
}
