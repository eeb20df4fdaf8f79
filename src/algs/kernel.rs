//! Near-equal split of a global extent over a line of processes.
//!
//! `glsize` points are shared by `nprocs` processes; process `rank` owns
//! `floor((glsize + rank) / nprocs)` of them, so the last `glsize % nprocs`
//! ranks carry one extra point. Example with `glsize = 10`, `nprocs = 3`:
//!
//! | rank | size | offset |
//! |------|------|--------|
//! | 0    | 3    | 0      |
//! | 1    | 3    | 3      |
//! | 2    | 4    | 6      |

use crate::decomp_error::DecompError;
use crate::topology::validation::{check_glsize, check_nprocs, check_rank, reject};

fn check_split(op: &'static str, glsize: usize, nprocs: usize, rank: usize) -> Result<(), DecompError> {
    check_nprocs(op, nprocs)?;
    check_glsize(op, glsize)?;
    if glsize < nprocs {
        return Err(reject(DecompError::invalid(
            op,
            "glsize",
            format!("glsize ({glsize}) should be equal to or more than nprocs ({nprocs})"),
        )));
    }
    if glsize.checked_add(nprocs).is_none() {
        return Err(reject(DecompError::overflow(
            op,
            "glsize",
            format!("sum of glsize ({glsize}) and nprocs ({nprocs}) is not representable"),
        )));
    }
    check_rank(op, nprocs, rank)
}

/// Number of points owned by `rank`.
pub fn local_extent(
    op: &'static str,
    glsize: usize,
    nprocs: usize,
    rank: usize,
) -> Result<usize, DecompError> {
    check_split(op, glsize, nprocs, rank)?;
    Ok((glsize + rank) / nprocs)
}

/// Index of the first point owned by `rank`.
pub fn local_offset(
    op: &'static str,
    glsize: usize,
    nprocs: usize,
    rank: usize,
) -> Result<usize, DecompError> {
    check_split(op, glsize, nprocs, rank)?;
    // ranks below `first_long` own `base` points, the rest `base + 1`
    let base = glsize / nprocs;
    let first_long = nprocs - glsize % nprocs;
    Ok(rank * base + rank.saturating_sub(first_long))
}

/// `(extent, offset)` of `rank` in one call.
pub fn local_split(
    op: &'static str,
    glsize: usize,
    nprocs: usize,
    rank: usize,
) -> Result<(usize, usize), DecompError> {
    Ok((
        local_extent(op, glsize, nprocs, rank)?,
        local_offset(op, glsize, nprocs, rank)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomp_error::ErrorKind;

    const OP: &str = "kernel.test";

    #[test]
    fn ten_over_three() {
        let sizes: Vec<_> = (0..3).map(|r| local_extent(OP, 10, 3, r).unwrap()).collect();
        let offsets: Vec<_> = (0..3).map(|r| local_offset(OP, 10, 3, r).unwrap()).collect();
        assert_eq!(sizes, vec![3, 3, 4]);
        assert_eq!(offsets, vec![0, 3, 6]);
    }

    #[test]
    fn offsets_match_running_sum() {
        for glsize in 1..40 {
            for nprocs in 1..=glsize {
                let mut acc = 0;
                for rank in 0..nprocs {
                    assert_eq!(local_offset(OP, glsize, nprocs, rank).unwrap(), acc);
                    acc += local_extent(OP, glsize, nprocs, rank).unwrap();
                }
                assert_eq!(acc, glsize);
            }
        }
    }

    #[test]
    fn rejects_bad_arguments() {
        assert_eq!(
            local_extent(OP, 2, 3, 0).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            local_extent(OP, 5, 0, 0).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            local_offset(OP, 5, 2, 2).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            local_extent(OP, i32::MAX as usize + 1, 2, 0).unwrap_err().kind(),
            ErrorKind::Overflow
        );
    }

    #[test]
    fn largest_extent_is_accepted() {
        let g = i32::MAX as usize;
        assert_eq!(local_extent(OP, g, 1, 0).unwrap(), g);
        assert_eq!(local_offset(OP, g, 2, 1).unwrap(), g / 2);
    }
}
