//! X1 <-> Y1 plans.
//!
//! The exchange runs over the whole grid (axis 0 has a single process, so
//! peers are ordered by their axis-1 coordinate). With `s` the source memory
//! shape, peer `q` receives the columns `s0` of its own range for all of this
//! process's `s1` rows, and sends back its `s1` range for this process's
//! `s0` columns.

use crate::algs::kernel::{local_extent, local_split};
use crate::data::region::{PeerSlot, Region};
use crate::decomp_error::DecompError;
use crate::topology::cartesian::CartTopology;
use crate::topology::pencil::{Pencil, memory_shape};

use super::plan::PlanTables;

pub(super) fn build(
    op: &'static str,
    cart: &CartTopology,
    bef: Pencil,
    glsizes: &[usize],
    e: usize,
) -> Result<PlanTables, DecompError> {
    let s = memory_shape(2, bef, glsizes);
    let grid = cart.clone();
    let n2 = grid.dims()[1];
    let m2 = grid.coords()[1];
    let mut tables = PlanTables::with_capacity(op, grid, n2)?;

    let my_s0 = local_extent(op, s[0], n2, m2)?;
    let my_s1 = local_extent(op, s[1], n2, m2)?;
    for q in 0..n2 {
        let (i, i_off) = local_split(op, s[0], n2, q)?;
        let send = PeerSlot {
            count: 1,
            displ: e * i_off,
            region: Region::strided(
                i,
                1,
                e,
                Region::strided(my_s1, 1, e * s[0], Region::contiguous(e)),
            ),
        };
        let (j, j_off) = local_split(op, s[1], n2, q)?;
        let recv = PeerSlot {
            count: 1,
            displ: e * j_off,
            region: Region::strided(my_s0, j, e * s[1], Region::contiguous(e)),
        };
        log::trace!("{op}: peer {q} send {send:?} recv {recv:?}");
        tables.sends.push(send);
        tables.recvs.push(recv);
    }
    Ok(tables)
}
