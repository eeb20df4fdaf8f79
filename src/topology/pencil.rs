//! Pencil orientations, axis selectors and the fixed tables relating them.
//!
//! A pencil names the memory order of a process's local slab. The base
//! process grid is laid out for the X1 pencil; every other pencil reuses the
//! same grid, with its logical axes mapped onto the grid axes by
//! [`grid_axis`]:
//!
//! ```text
//! 2D        x  y        3D        x  y  z
//!   X1      0  1          X1      0  1  2
//!   Y1      1  0          Y1      1  0  2
//!                         Z1      1  2  0
//!                         X2      0  2  1
//!                         Y2      2  0  1
//!                         Z2      2  1  0
//! ```
//!
//! Rotations step along X1 -> Y1 -> Z1 -> X2 -> Y2 -> Z2 -> X1 (forward) or
//! the reverse (backward). In 2D only X1 <-> Y1 exists.

use crate::decomp_error::DecompError;
use crate::topology::validation::{check_axis, check_pencil, reject};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pencil orientation of a local slab.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Pencil {
    X1 = 0,
    Y1 = 1,
    Z1 = 2,
    X2 = 3,
    Y2 = 4,
    Z2 = 5,
}

/// Logical direction of the global array.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

/// Direction of a 3D rotation step.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Rotation {
    Forward,
    Backward,
}

impl Pencil {
    /// All pencils in rotation order.
    pub const ALL: [Pencil; 6] = [
        Pencil::X1,
        Pencil::Y1,
        Pencil::Z1,
        Pencil::X2,
        Pencil::Y2,
        Pencil::Z2,
    ];

    /// Pencils defined for a domain of `ndims` dimensions.
    pub fn all_for(ndims: usize) -> &'static [Pencil] {
        match ndims {
            2 => &Self::ALL[..2],
            3 => &Self::ALL,
            _ => &[],
        }
    }

    /// Next pencil along the 3D forward rotation.
    pub fn next(self) -> Pencil {
        Self::ALL[(self as usize + 1) % 6]
    }

    /// Previous pencil along the 3D forward rotation.
    pub fn prev(self) -> Pencil {
        Self::ALL[(self as usize + 5) % 6]
    }

    /// Logical axes in memory order, contiguous first.
    pub fn memory_axes(self, ndims: usize) -> &'static [Axis] {
        use Axis::*;
        match (ndims, self) {
            (2, Pencil::X1) => &[X, Y],
            (2, _) => &[Y, X],
            (_, Pencil::X1 | Pencil::X2) => &[X, Y, Z],
            (_, Pencil::Y1 | Pencil::Y2) => &[Y, Z, X],
            (_, Pencil::Z1 | Pencil::Z2) => &[Z, X, Y],
        }
    }
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Axes defined for a domain of `ndims` dimensions.
    pub fn all_for(ndims: usize) -> &'static [Axis] {
        &Self::ALL[..ndims.min(3)]
    }
}

impl TryFrom<u8> for Pencil {
    type Error = DecompError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(raw as usize).copied().ok_or_else(|| {
            reject(DecompError::invalid(
                "pencil.try_from",
                "pencil",
                format!("invalid pencil: {raw}"),
            ))
        })
    }
}

impl TryFrom<u8> for Axis {
    type Error = DecompError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(raw as usize).copied().ok_or_else(|| {
            reject(DecompError::invalid(
                "axis.try_from",
                "axis",
                format!("invalid dir: {raw}"),
            ))
        })
    }
}

impl fmt::Display for Pencil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pencil::X1 => "x1",
            Pencil::Y1 => "y1",
            Pencil::Z1 => "z1",
            Pencil::X2 => "x2",
            Pencil::Y2 => "y2",
            Pencil::Z2 => "z2",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

const TABLE_2D: [[usize; 2]; 2] = [[0, 1], [1, 0]];

const TABLE_3D: [[usize; 3]; 6] = [
    [0, 1, 2],
    [1, 0, 2],
    [1, 2, 0],
    [0, 2, 1],
    [2, 0, 1],
    [2, 1, 0],
];

/// Grid axis that carries logical `axis` when the data is in `pencil`.
pub fn grid_axis(
    op: &'static str,
    ndims: usize,
    pencil: Pencil,
    axis: Axis,
) -> Result<usize, DecompError> {
    check_pencil(op, ndims, pencil)?;
    check_axis(op, ndims, axis)?;
    Ok(if ndims == 2 {
        TABLE_2D[pencil as usize][axis as usize]
    } else {
        TABLE_3D[pencil as usize][axis as usize]
    })
}

/// Global extents permuted into the memory order of `pencil`.
///
/// `glsizes` is indexed by physical axis (x, y[, z]).
pub fn memory_shape(ndims: usize, pencil: Pencil, glsizes: &[usize]) -> Vec<usize> {
    pencil
        .memory_axes(ndims)
        .iter()
        .map(|&a| glsizes[a as usize])
        .collect()
}

/// Grid axis left out of the exchange sub-grid of a 3D rotation from `bef`.
///
/// Forward from X1 the physical z direction keeps its distribution, from Y1
/// physical x, from Z1 physical y, and so on around the cycle; the table
/// stores where that direction lives on the base grid.
pub fn unchanged_grid_axis(rotation: Rotation, bef: Pencil) -> usize {
    let first = matches!(bef, Pencil::X1 | Pencil::Z1 | Pencil::Y2);
    match (rotation, first) {
        (Rotation::Forward, true) | (Rotation::Backward, false) => 2,
        (Rotation::Forward, false) | (Rotation::Backward, true) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OP: &str = "pencil.test";

    #[test]
    fn cycle_closes() {
        let mut p = Pencil::X1;
        for _ in 0..6 {
            assert_eq!(p.next().prev(), p);
            p = p.next();
        }
        assert_eq!(p, Pencil::X1);
        assert_eq!(Pencil::Z2.next(), Pencil::X1);
        assert_eq!(Pencil::X1.prev(), Pencil::Z2);
    }

    #[test]
    fn tables_are_permutations() {
        for row in TABLE_3D {
            let mut r = row;
            r.sort();
            assert_eq!(r, [0, 1, 2]);
        }
        // the memory-contiguous axis is never split
        for &p in &Pencil::ALL {
            let contiguous = p.memory_axes(3)[0];
            assert_eq!(grid_axis(OP, 3, p, contiguous).unwrap(), 0);
        }
        for &p in Pencil::all_for(2) {
            let contiguous = p.memory_axes(2)[0];
            assert_eq!(grid_axis(OP, 2, p, contiguous).unwrap(), 0);
        }
    }

    #[test]
    fn memory_shapes() {
        let g = [4, 5, 6];
        assert_eq!(memory_shape(3, Pencil::X2, &g), vec![4, 5, 6]);
        assert_eq!(memory_shape(3, Pencil::Y1, &g), vec![5, 6, 4]);
        assert_eq!(memory_shape(3, Pencil::Z2, &g), vec![6, 4, 5]);
        assert_eq!(memory_shape(2, Pencil::Y1, &g[..2]), vec![5, 4]);
    }

    #[test]
    fn unchanged_axis_keeps_its_distribution() {
        // the grid axis left out must carry the same logical axis before and after
        for &bef in &Pencil::ALL {
            for (rotation, aft) in [(Rotation::Forward, bef.next()), (Rotation::Backward, bef.prev())] {
                let dim = unchanged_grid_axis(rotation, bef);
                let kept: Vec<_> = Axis::ALL
                    .iter()
                    .filter(|&&a| grid_axis(OP, 3, bef, a).unwrap() == dim)
                    .filter(|&&a| grid_axis(OP, 3, aft, a).unwrap() == dim)
                    .collect();
                assert_eq!(kept.len(), 1, "{bef} -> {aft}");
            }
        }
    }

    #[test]
    fn raw_tags() {
        assert_eq!(Pencil::try_from(4u8), Ok(Pencil::Y2));
        assert!(Pencil::try_from(6u8).is_err());
        assert_eq!(Axis::try_from(2u8), Ok(Axis::Z));
        assert!(Axis::try_from(3u8).is_err());
    }
}
