//! Decomposition context: a Cartesian process grid over a communicator.
//!
//! The grid is laid out for the X1 pencil with axis 0 never split, so the
//! memory-contiguous direction of every pencil stays local. Queries for other
//! pencils go through the [`grid_axis`] tables.

use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::kernel;
use crate::decomp_error::DecompError;
use crate::topology::cartesian::CartTopology;
use crate::topology::geometry::PencilBlock;
use crate::topology::pencil::{Axis, Pencil, grid_axis};
use crate::topology::validation::{AXIS_NPROCS_LIMIT, check_len, check_ndims, reject};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU16, Ordering};

/// First tag handed to a transpose plan.
const TAG_BASE: u16 = 0x0400;
/// Plans cycle through this many tags before reusing one.
const TAG_SPAN: u16 = 0x4000;

/// How to lay out the process grid.
///
/// `dims` all zero asks for an automatic balanced factoring of the group
/// size; otherwise every entry is taken as given and `dims[0]` must be 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompConfig {
    pub ndims: usize,
    pub dims: Vec<usize>,
    pub periods: Vec<bool>,
}

impl DecompConfig {
    /// Automatic grid, no periodic axes.
    pub fn new(ndims: usize) -> Self {
        DecompConfig {
            ndims,
            dims: vec![0; ndims],
            periods: vec![false; ndims],
        }
    }

    pub fn with_dims(mut self, dims: impl Into<Vec<usize>>) -> Self {
        self.dims = dims.into();
        self
    }

    pub fn with_periods(mut self, periods: impl Into<Vec<bool>>) -> Self {
        self.periods = periods.into();
        self
    }
}

/// Process grid shared by all pencils of a 2D or 3D domain.
#[derive(Debug)]
pub struct Decomposition<C: Communicator> {
    ndims: usize,
    comm: C,
    cart: CartTopology,
    next_tag: AtomicU16,
}

impl<C: Communicator> Decomposition<C> {
    /// Build the process grid. Collective over `comm`.
    pub fn construct(comm: C, config: &DecompConfig) -> Result<Self, DecompError> {
        const OP: &str = "decomp.construct";
        let ndims = config.ndims;
        check_ndims(OP, ndims)?;
        check_len(OP, "dims", ndims, config.dims.len())?;
        check_len(OP, "periods", ndims, config.periods.len())?;
        let nprocs = comm.size();
        let dims = grid_dims(OP, nprocs, &config.dims)?;
        let cart = CartTopology::create(nprocs, comm.rank(), &dims, &config.periods)?;
        if cart.rank() == 0 {
            log::debug!(
                "process distribution {:?}, periodic {:?} ({nprocs} processes)",
                cart.dims(),
                cart.periods()
            );
        }
        Ok(Decomposition {
            ndims,
            comm,
            cart,
            next_tag: AtomicU16::new(0),
        })
    }

    /// Release the grid.
    pub fn destruct(self) {
        log::debug!("releasing decomposition on rank {}", self.cart.rank());
    }

    pub fn ndims(&self) -> usize {
        self.ndims
    }

    /// Number of processes in the grid.
    pub fn comm_size(&self) -> usize {
        self.cart.size()
    }

    /// Rank of this process in the grid.
    pub fn comm_rank(&self) -> usize {
        self.cart.rank()
    }

    pub fn cart_topology(&self) -> &CartTopology {
        &self.cart
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Processes sharing logical `axis` when the data is in `pencil`.
    pub fn nprocs(&self, pencil: Pencil, axis: Axis) -> Result<usize, DecompError> {
        let dim = grid_axis("decomp.get_nprocs", self.ndims, pencil, axis)?;
        Ok(self.cart.dims()[dim])
    }

    /// This process's position along logical `axis` when the data is in `pencil`.
    pub fn myrank(&self, pencil: Pencil, axis: Axis) -> Result<usize, DecompError> {
        let dim = grid_axis("decomp.get_myrank", self.ndims, pencil, axis)?;
        Ok(self.cart.coords()[dim])
    }

    /// Ranks one step below and above along logical `axis`: `[minus, plus]`.
    /// `None` marks a non-periodic boundary.
    pub fn neighbours(&self, pencil: Pencil, axis: Axis) -> Result<[Option<usize>; 2], DecompError> {
        const OP: &str = "decomp.get_neighbours";
        let dim = grid_axis(OP, self.ndims, pencil, axis)?;
        let (minus, plus) = self.cart.shift(dim, 1)?;
        Ok([minus, plus])
    }

    /// Points of a `glsize`-long `axis` held by this process in `pencil`.
    pub fn pencil_local_size(
        &self,
        pencil: Pencil,
        axis: Axis,
        glsize: usize,
    ) -> Result<usize, DecompError> {
        const OP: &str = "decomp.get_pencil_mysize";
        let dim = grid_axis(OP, self.ndims, pencil, axis)?;
        kernel::local_extent(OP, glsize, self.cart.dims()[dim], self.cart.coords()[dim])
    }

    /// Global index of this process's first point of `axis` in `pencil`.
    pub fn pencil_local_offset(
        &self,
        pencil: Pencil,
        axis: Axis,
        glsize: usize,
    ) -> Result<usize, DecompError> {
        const OP: &str = "decomp.get_pencil_offset";
        let dim = grid_axis(OP, self.ndims, pencil, axis)?;
        kernel::local_offset(OP, glsize, self.cart.dims()[dim], self.cart.coords()[dim])
    }

    /// Sizes and offsets of this process's block of a `glsizes` array in `pencil`.
    pub fn pencil_block(&self, pencil: Pencil, glsizes: &[usize]) -> Result<PencilBlock, DecompError> {
        PencilBlock::new(self, pencil, glsizes)
    }

    /// Fresh message tag for a plan. Every process draws tags in the same
    /// order because plans are built collectively.
    pub(crate) fn next_tag(&self) -> CommTag {
        let n = self.next_tag.fetch_add(1, Ordering::Relaxed) % TAG_SPAN;
        CommTag::new(TAG_BASE).offset(n)
    }
}

/// Per-axis process counts for a grid over `nprocs` processes.
fn grid_dims(op: &'static str, nprocs: usize, requested: &[usize]) -> Result<Vec<usize>, DecompError> {
    let mut dims = requested.to_vec();
    if dims.iter().all(|&d| d == 0) {
        dims[0] = 1;
        CartTopology::dims_create(nprocs, &mut dims)?;
        return Ok(dims);
    }
    if dims[0] != 1 {
        return Err(reject(DecompError::invalid(
            op,
            "dims",
            format!("dims[0] should be 1 (the first axis is never split), got {}", dims[0]),
        )));
    }
    if let Some((i, &d)) = dims
        .iter()
        .enumerate()
        .find(|&(_, &d)| d == 0 || d >= AXIS_NPROCS_LIMIT)
    {
        return Err(reject(DecompError::invalid(
            op,
            "dims",
            format!("dims[{i}] = {d} should be in 1..{AXIS_NPROCS_LIMIT}"),
        )));
    }
    let total = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| reject(DecompError::overflow(op, "dims", "product of dims overflows")))?;
    if total != nprocs {
        return Err(reject(DecompError::invalid(
            op,
            "dims",
            format!("product of dims {dims:?} is {total}, the group has {nprocs} processes"),
        )));
    }
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::decomp_error::ErrorKind;

    #[test]
    fn serial_grid_is_all_ones() {
        let d = Decomposition::construct(NoComm, &DecompConfig::new(3)).unwrap();
        assert_eq!(d.cart_topology().dims(), &[1, 1, 1]);
        assert_eq!((d.comm_size(), d.comm_rank(), d.ndims()), (1, 0, 3));
        for &p in &Pencil::ALL {
            for &a in Axis::all_for(3) {
                assert_eq!(d.nprocs(p, a).unwrap(), 1);
                assert_eq!(d.myrank(p, a).unwrap(), 0);
                assert_eq!(d.neighbours(p, a).unwrap(), [None, None]);
            }
        }
        d.destruct();
    }

    #[test]
    fn explicit_dims_are_checked() {
        let bad = [
            DecompConfig::new(2).with_dims([2, 1]),
            DecompConfig::new(2).with_dims([1, 2]),
            DecompConfig::new(3).with_dims([1, 0, 1]),
            DecompConfig::new(2).with_dims([1, 1, 1]),
            DecompConfig::new(4),
        ];
        for config in &bad {
            let err = Decomposition::construct(NoComm, config).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{config:?}");
        }
        assert!(grid_dims("decomp.test", 1 << 16, &[1, 1 << 16]).is_err());
        assert_eq!(grid_dims("decomp.test", 12, &[1, 3, 4]).unwrap(), vec![1, 3, 4]);
    }

    #[test]
    fn automatic_dims_pin_first_axis() {
        assert_eq!(grid_dims("decomp.test", 6, &[0, 0, 0]).unwrap(), vec![1, 3, 2]);
        assert_eq!(grid_dims("decomp.test", 5, &[0, 0]).unwrap(), vec![1, 5]);
    }

    #[test]
    fn tags_advance_per_plan() {
        let d = Decomposition::construct(NoComm, &DecompConfig::new(2)).unwrap();
        let a = d.next_tag();
        let b = d.next_tag();
        assert_ne!(a, b);
        assert_eq!(b, a.offset(1));
    }

    #[test]
    fn periodic_neighbours_wrap_to_self() {
        let config = DecompConfig::new(2).with_periods([true, true]);
        let d = Decomposition::construct(NoComm, &config).unwrap();
        assert_eq!(d.neighbours(Pencil::X1, Axis::Y).unwrap(), [Some(0), Some(0)]);
        assert!(d.neighbours(Pencil::Z1, Axis::X).is_err());
        assert!(d.neighbours(Pencil::X1, Axis::Z).is_err());
    }
}
