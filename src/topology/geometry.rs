//! This process's block of a global array in a given pencil.

use crate::algs::communicator::Communicator;
use crate::decomp_error::DecompError;
use crate::topology::decomposition::Decomposition;
use crate::topology::pencil::{Axis, Pencil};
use crate::topology::validation::{check_glsize, check_len, check_pencil};

/// Local sizes and global offsets per logical axis, plus index helpers for
/// walking a local buffer stored in the pencil's memory order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PencilBlock {
    pencil: Pencil,
    glsizes: Vec<usize>,
    sizes: Vec<usize>,
    offsets: Vec<usize>,
}

impl PencilBlock {
    pub fn new<C: Communicator>(
        decomp: &Decomposition<C>,
        pencil: Pencil,
        glsizes: &[usize],
    ) -> Result<Self, DecompError> {
        const OP: &str = "decomp.pencil_block";
        let ndims = decomp.ndims();
        check_pencil(OP, ndims, pencil)?;
        check_len(OP, "glsizes", ndims, glsizes.len())?;
        glsizes.iter().try_for_each(|&g| check_glsize(OP, g))?;
        let axes = Axis::all_for(ndims);
        let sizes = axes
            .iter()
            .map(|&a| decomp.pencil_local_size(pencil, a, glsizes[a as usize]))
            .collect::<Result<Vec<_>, _>>()?;
        let offsets = axes
            .iter()
            .map(|&a| decomp.pencil_local_offset(pencil, a, glsizes[a as usize]))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PencilBlock {
            pencil,
            glsizes: glsizes.to_vec(),
            sizes,
            offsets,
        })
    }

    pub fn pencil(&self) -> Pencil {
        self.pencil
    }

    pub fn ndims(&self) -> usize {
        self.glsizes.len()
    }

    pub fn glsizes(&self) -> &[usize] {
        &self.glsizes
    }

    /// Local extents indexed by logical axis.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Global offsets indexed by logical axis.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn size(&self, axis: Axis) -> usize {
        self.sizes[axis as usize]
    }

    pub fn offset(&self, axis: Axis) -> usize {
        self.offsets[axis as usize]
    }

    /// Local extents in memory order, contiguous first.
    pub fn memory_shape(&self) -> Vec<usize> {
        self.pencil
            .memory_axes(self.ndims())
            .iter()
            .map(|&a| self.sizes[a as usize])
            .collect()
    }

    /// Number of local elements.
    pub fn len(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Local index per logical axis of the element stored at `linear`.
    pub fn local_indices(&self, mut linear: usize) -> Vec<usize> {
        let mut idx = vec![0; self.ndims()];
        for &a in self.pencil.memory_axes(self.ndims()) {
            let n = self.sizes[a as usize];
            idx[a as usize] = linear % n;
            linear /= n;
        }
        idx
    }

    /// Global linear index `x + gx * (y + gy * z)` of the element stored at
    /// `linear`. The same element has the same global index in every pencil.
    pub fn global_index(&self, linear: usize) -> usize {
        self.local_indices(linear)
            .iter()
            .zip(&self.offsets)
            .zip(&self.glsizes)
            .rev()
            .fold(0, |acc, ((&i, &o), &g)| acc * g + i + o)
    }
}
