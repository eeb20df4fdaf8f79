//! Cartesian process grid over a flat process group.
//!
//! Grid ranks are assigned row-major over the grid axes (the last axis varies
//! fastest), the same convention as MPI Cartesian communicators. A grid may be
//! the base grid of a decomposition or a sub-grid obtained with
//! [`CartTopology::sub`]; `members` maps every grid rank to the rank of the
//! process in the underlying group, so messages can be addressed through the
//! group communicator.

use crate::decomp_error::DecompError;
use crate::topology::validation::{check_len, check_nprocs, check_rank, reject};
use serde::{Deserialize, Serialize};

/// Layout of a grid as seen from one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartesianLayout {
    pub dims: Vec<usize>,
    pub periods: Vec<bool>,
    pub coords: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartTopology {
    dims: Vec<usize>,
    periods: Vec<bool>,
    coords: Vec<usize>,
    rank: usize,
    members: Vec<usize>,
}

impl CartTopology {
    /// Grid over a group of `nprocs` processes, seen from group rank `rank`.
    ///
    /// The product of `dims` must equal `nprocs`.
    pub fn create(
        nprocs: usize,
        rank: usize,
        dims: &[usize],
        periods: &[bool],
    ) -> Result<Self, DecompError> {
        const OP: &str = "cart.create";
        check_nprocs(OP, nprocs)?;
        check_rank(OP, nprocs, rank)?;
        check_len(OP, "periods", dims.len(), periods.len())?;
        let total = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| reject(DecompError::overflow(OP, "dims", "product of dims overflows")))?;
        if dims.iter().any(|&d| d == 0) || total != nprocs {
            return Err(reject(DecompError::invalid(
                OP,
                "dims",
                format!("dims {dims:?} do not describe a grid of {nprocs} processes"),
            )));
        }
        let mut cart = CartTopology {
            dims: dims.to_vec(),
            periods: periods.to_vec(),
            coords: Vec::new(),
            rank,
            members: (0..nprocs).collect(),
        };
        cart.coords = cart.coords_of(rank);
        Ok(cart)
    }

    /// Fill the zero entries of `dims` with a balanced factorisation of
    /// `nprocs`, in non-increasing order. Non-zero entries are kept.
    pub fn dims_create(nprocs: usize, dims: &mut [usize]) -> Result<(), DecompError> {
        const OP: &str = "cart.dims_create";
        check_nprocs(OP, nprocs)?;
        let fixed: usize = dims.iter().filter(|&&d| d != 0).product();
        if fixed == 0 || nprocs % fixed != 0 {
            return Err(reject(DecompError::invalid(
                OP,
                "dims",
                format!("fixed dims {dims:?} do not divide {nprocs}"),
            )));
        }
        let free: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] == 0).collect();
        let remaining = nprocs / fixed;
        if free.is_empty() {
            if remaining != 1 {
                return Err(reject(DecompError::invalid(
                    OP,
                    "dims",
                    format!("dims {dims:?} do not multiply to {nprocs}"),
                )));
            }
            return Ok(());
        }
        let mut sizes = balanced_split(remaining, free.len(), 1).unwrap_or_else(|| {
            let mut sizes = vec![1; free.len()];
            sizes[0] = remaining;
            sizes
        });
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        for (&i, s) in free.iter().zip(sizes) {
            dims[i] = s;
        }
        Ok(())
    }

    pub fn ndims(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn periods(&self) -> &[bool] {
        &self.periods
    }

    pub fn coords(&self) -> &[usize] {
        &self.coords
    }

    /// Rank of this process within the grid.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of processes in the grid.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Group ranks of the grid's processes, indexed by grid rank.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Group rank of grid rank `rank`.
    pub fn member(&self, rank: usize) -> usize {
        self.members[rank]
    }

    pub fn layout(&self) -> CartesianLayout {
        CartesianLayout {
            dims: self.dims.clone(),
            periods: self.periods.clone(),
            coords: self.coords.clone(),
        }
    }

    /// Coordinates of grid rank `rank`.
    pub fn coords_of(&self, mut rank: usize) -> Vec<usize> {
        let mut coords = vec![0; self.dims.len()];
        for (c, &d) in coords.iter_mut().zip(&self.dims).rev() {
            *c = rank % d;
            rank /= d;
        }
        coords
    }

    /// Grid rank at `coords`.
    pub fn rank_of(&self, coords: &[usize]) -> usize {
        coords
            .iter()
            .zip(&self.dims)
            .fold(0, |acc, (&c, &d)| acc * d + c)
    }

    /// Group ranks one step `disp` away along `axis`: `(source, dest)`, i.e.
    /// the processes at `coord - disp` and `coord + disp`. `None` marks a
    /// non-periodic boundary.
    pub fn shift(
        &self,
        axis: usize,
        disp: isize,
    ) -> Result<(Option<usize>, Option<usize>), DecompError> {
        const OP: &str = "cart.shift";
        check_rank(OP, self.ndims(), axis)?;
        let neighbour = |step: isize| -> Option<usize> {
            let d = self.dims[axis] as isize;
            let mut c = self.coords[axis] as isize + step;
            if self.periods[axis] {
                c = c.rem_euclid(d);
            } else if c < 0 || c >= d {
                return None;
            }
            let mut coords = self.coords.clone();
            coords[axis] = c as usize;
            Some(self.members[self.rank_of(&coords)])
        };
        Ok((neighbour(-disp), neighbour(disp)))
    }

    /// Sub-grid of the processes sharing this process's coordinates on every
    /// axis where `remain` is false. Kept axes retain their order.
    pub fn sub(&self, remain: &[bool]) -> Result<CartTopology, DecompError> {
        const OP: &str = "cart.sub";
        check_len(OP, "remain_dims", self.ndims(), remain.len())?;
        let kept: Vec<usize> = (0..self.ndims()).filter(|&i| remain[i]).collect();
        let dims: Vec<usize> = kept.iter().map(|&i| self.dims[i]).collect();
        let periods: Vec<bool> = kept.iter().map(|&i| self.periods[i]).collect();
        let coords: Vec<usize> = kept.iter().map(|&i| self.coords[i]).collect();
        let size: usize = dims.iter().product();
        let mut members = Vec::new();
        members
            .try_reserve_exact(size)
            .map_err(|_| DecompError::OutOfMemory {
                op: OP,
                what: "sub-grid members",
            })?;
        let mut full = self.coords.clone();
        let mut sub = CartTopology {
            dims,
            periods,
            coords,
            rank: 0,
            members: Vec::new(),
        };
        for r in 0..size {
            for (&axis, c) in kept.iter().zip(sub.coords_of(r)) {
                full[axis] = c;
            }
            members.push(self.members[self.rank_of(&full)]);
        }
        sub.rank = sub.rank_of(&sub.coords);
        sub.members = members;
        Ok(sub)
    }
}

/// Factorisation of `n` into `k` non-decreasing factors, each at least `lo`,
/// with the smallest gap between the largest and the smallest factor.
fn balanced_split(n: usize, k: usize, lo: usize) -> Option<Vec<usize>> {
    if k == 1 {
        return (n >= lo).then(|| vec![n]);
    }
    let mut best: Option<Vec<usize>> = None;
    let mut d = lo.max(1);
    while d.checked_pow(k as u32).is_some_and(|p| p <= n) {
        if n % d == 0 {
            if let Some(mut rest) = balanced_split(n / d, k - 1, d) {
                rest.insert(0, d);
                let gap = |v: &[usize]| v[v.len() - 1] - v[0];
                if best.as_deref().is_none_or(|b| gap(&rest) < gap(b)) {
                    best = Some(rest);
                }
            }
        }
        d += 1;
    }
    best
}
