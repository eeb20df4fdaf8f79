//! Plans for one step along the six-pencil rotation cycle.
//!
//! A step changes the distribution of two logical axes and leaves the third
//! alone. The grid axis carrying the untouched one is dropped, and each slice
//! along it exchanges independently over the remaining `1 x n2` sub-grid.
//!
//! With `s` the source memory shape (`s0` contiguous), `n2`/`m2` the sub-grid
//! size and coordinate, `n1`/`m1` the same along the dropped axis, peer `q`
//! of a forward step is sent this process's `s1 x s2` block for `q`'s range
//! of `s0`, and a backward step sends the `s0` range with `s2` innermost so
//! the receiver can store it contiguously.

use crate::algs::kernel::{local_extent, local_split};
use crate::data::region::{PeerSlot, Region};
use crate::decomp_error::DecompError;
use crate::topology::cartesian::CartTopology;
use crate::topology::pencil::{Pencil, Rotation, memory_shape, unchanged_grid_axis};

use super::plan::PlanTables;

pub(super) fn build(
    op: &'static str,
    cart: &CartTopology,
    rotation: Rotation,
    bef: Pencil,
    glsizes: &[usize],
    e: usize,
) -> Result<PlanTables, DecompError> {
    let s = memory_shape(3, bef, glsizes);
    let dropped = unchanged_grid_axis(rotation, bef);
    let n1 = cart.dims()[dropped];
    let m1 = cart.coords()[dropped];
    let grid = cart.sub(&[true, dropped != 1, dropped != 2])?;
    let n2 = grid.dims()[1];
    let m2 = grid.coords()[1];
    let mut tables = PlanTables::with_capacity(op, grid, n2)?;

    let my_s0 = local_extent(op, s[0], n2, m2)?;
    for q in 0..n2 {
        let (i, i_off) = local_split(op, s[0], n2, q)?;
        let (send, recv) = match rotation {
            Rotation::Forward => {
                let j = local_extent(op, s[1], n2, m2)?;
                let k = local_extent(op, s[2], n1, m1)?;
                let (jq, jq_off) = local_split(op, s[1], n2, q)?;
                let send = PeerSlot {
                    count: 1,
                    displ: e * i_off,
                    region: Region::strided(
                        i,
                        1,
                        e,
                        Region::strided(j * k, 1, e * s[0], Region::contiguous(e)),
                    ),
                };
                let recv = PeerSlot {
                    count: 1,
                    displ: e * jq_off,
                    region: Region::strided(k * my_s0, jq, e * s[1], Region::contiguous(e)),
                };
                (send, recv)
            }
            Rotation::Backward => {
                let j = local_extent(op, s[1], n1, m1)?;
                let k = local_extent(op, s[2], n2, m2)?;
                let (kq, kq_off) = local_split(op, s[2], n2, q)?;
                let send = PeerSlot {
                    count: 1,
                    displ: e * i_off,
                    region: Region::strided(
                        j,
                        1,
                        e * s[0],
                        Region::strided(
                            i,
                            1,
                            e,
                            Region::strided(k, 1, e * s[0] * j, Region::contiguous(e)),
                        ),
                    ),
                };
                let recv = PeerSlot {
                    count: 1,
                    displ: e * kq_off,
                    region: Region::strided(my_s0 * j, kq, e * s[2], Region::contiguous(e)),
                };
                (send, recv)
            }
        };
        log::trace!("{op}: peer {q} send {send:?} recv {recv:?}");
        tables.sends.push(send);
        tables.recvs.push(recv);
    }
    Ok(tables)
}
