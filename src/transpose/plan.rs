//! Transpose plan: construction, execution and teardown.
//!
//! Construction validates everything up front in a fixed order: element size,
//! pencil pair, global extents, feasibility of every split, local buffer byte
//! sizes. Only then are the per-peer tables allocated, so a failed
//! construction never leaves anything behind.

use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::exchange::all_to_all_w;
use crate::algs::wire::{as_bytes, as_bytes_mut, expect_element_type};
use crate::data::region::PeerSlot;
use crate::debug_invariants::DebugInvariants;
use crate::decomp_error::DecompError;
use crate::topology::cartesian::CartTopology;
use crate::topology::decomposition::Decomposition;
use crate::topology::pencil::{Axis, Pencil};
use crate::topology::validation::{
    check_element_size, check_glsize, check_len, check_message_len, check_pencil_pair_2d,
    check_pencil_pair_3d, reject,
};
use bytemuck::Pod;
use itertools::Itertools;

use super::{plan_2d, plan_3d};

/// Exchange grid and per-peer slots produced by a plan builder.
pub(super) struct PlanTables {
    pub grid: CartTopology,
    pub sends: Vec<PeerSlot>,
    pub recvs: Vec<PeerSlot>,
}

impl PlanTables {
    /// Empty tables with room for `npeers` slots on each side.
    pub fn with_capacity(
        op: &'static str,
        grid: CartTopology,
        npeers: usize,
    ) -> Result<Self, DecompError> {
        let mut sends = Vec::new();
        sends
            .try_reserve_exact(npeers)
            .map_err(|_| DecompError::OutOfMemory {
                op,
                what: "send descriptors",
            })?;
        let mut recvs = Vec::new();
        recvs
            .try_reserve_exact(npeers)
            .map_err(|_| DecompError::OutOfMemory {
                op,
                what: "recv descriptors",
            })?;
        Ok(PlanTables { grid, sends, recvs })
    }
}

/// All-to-all plan moving a distributed array from one pencil to another.
///
/// The plan owns a clone of the communicator and the grid it exchanges over,
/// so it does not borrow the [`Decomposition`] it was built from.
#[derive(Debug)]
pub struct TransposePlan<C: Communicator> {
    comm: C,
    grid: CartTopology,
    tag: CommTag,
    pencil_bef: Pencil,
    pencil_aft: Pencil,
    element_size: usize,
    send_len: usize,
    recv_len: usize,
    sends: Vec<PeerSlot>,
    recvs: Vec<PeerSlot>,
}

impl<C: Communicator + Clone> TransposePlan<C> {
    /// Build the plan taking `pencil_bef` buffers to `pencil_aft` buffers for
    /// an array of `glsizes` (indexed by logical axis) whose elements are
    /// `size_of_element` bytes. Collective over the decomposition.
    pub fn construct(
        decomp: &Decomposition<C>,
        pencil_bef: Pencil,
        pencil_aft: Pencil,
        glsizes: &[usize],
        size_of_element: usize,
    ) -> Result<Self, DecompError> {
        const OP: &str = "transpose.construct";
        let ndims = decomp.ndims();
        check_element_size(OP, size_of_element)?;
        let rotation = if ndims == 2 {
            check_pencil_pair_2d(OP, pencil_bef, pencil_aft)?;
            None
        } else {
            Some(check_pencil_pair_3d(OP, pencil_bef, pencil_aft)?)
        };
        check_len(OP, "glsizes", ndims, glsizes.len())?;
        glsizes.iter().try_for_each(|&g| check_glsize(OP, g))?;
        for pencil in [pencil_bef, pencil_aft] {
            check_feasible(OP, decomp, pencil, glsizes)?;
        }
        let send_len = buffer_len(OP, decomp, pencil_bef, glsizes, size_of_element)?;
        let recv_len = buffer_len(OP, decomp, pencil_aft, glsizes, size_of_element)?;

        let cart = decomp.cart_topology();
        let tables = match rotation {
            None => plan_2d::build(OP, cart, pencil_bef, glsizes, size_of_element)?,
            Some(rotation) => {
                plan_3d::build(OP, cart, rotation, pencil_bef, glsizes, size_of_element)?
            }
        };
        for slot in &tables.sends {
            check_message_len(OP, "glsizes", slot.size())?;
        }
        for slot in &tables.recvs {
            check_message_len(OP, "glsizes", slot.size())?;
        }
        let plan = TransposePlan {
            comm: decomp.comm().clone(),
            grid: tables.grid,
            tag: decomp.next_tag(),
            pencil_bef,
            pencil_aft,
            element_size: size_of_element,
            send_len,
            recv_len,
            sends: tables.sends,
            recvs: tables.recvs,
        };
        log::debug!(
            "rank {}: plan {pencil_bef} -> {pencil_aft} over {} peers, {} -> {} bytes, tag {}",
            decomp.comm_rank(),
            plan.grid.size(),
            send_len,
            recv_len,
            plan.tag.as_u16()
        );
        plan.debug_assert_invariants();
        Ok(plan)
    }
}

impl<C: Communicator> TransposePlan<C> {
    /// Move `sendbuf` (source pencil) into `recvbuf` (destination pencil).
    /// Collective over the plan's exchange grid; blocks until this process's
    /// share has arrived.
    pub fn execute(&self, sendbuf: &[u8], recvbuf: &mut [u8]) -> Result<(), DecompError> {
        const OP: &str = "transpose.execute";
        check_len(OP, "sendbuf", self.send_len, sendbuf.len())?;
        check_len(OP, "recvbuf", self.recv_len, recvbuf.len())?;
        all_to_all_w(
            OP,
            &self.comm,
            &self.grid,
            self.tag,
            sendbuf,
            &self.sends,
            recvbuf,
            &self.recvs,
        )
    }

    /// [`execute`](Self::execute) over typed buffers. `T` must be exactly as
    /// large as the plan's element size.
    pub fn execute_typed<T: Pod>(&self, sendbuf: &[T], recvbuf: &mut [T]) -> Result<(), DecompError> {
        expect_element_type::<T>("transpose.execute", self.element_size)?;
        self.execute(as_bytes(sendbuf), as_bytes_mut(recvbuf))
    }

    /// Release the plan.
    pub fn destruct(self) {
        log::debug!(
            "releasing plan {} -> {} (tag {})",
            self.pencil_bef,
            self.pencil_aft,
            self.tag.as_u16()
        );
    }

    pub fn pencil_bef(&self) -> Pencil {
        self.pencil_bef
    }

    pub fn pencil_aft(&self) -> Pencil {
        self.pencil_aft
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Bytes of the source buffer handed to `execute`.
    pub fn send_len(&self) -> usize {
        self.send_len
    }

    /// Bytes of the destination buffer handed to `execute`.
    pub fn recv_len(&self) -> usize {
        self.recv_len
    }

    /// Grid of processes this plan exchanges with.
    pub fn grid(&self) -> &CartTopology {
        &self.grid
    }

    pub fn sends(&self) -> &[PeerSlot] {
        &self.sends
    }

    pub fn recvs(&self) -> &[PeerSlot] {
        &self.recvs
    }
}

impl<C: Communicator> DebugInvariants for TransposePlan<C> {
    fn validate_invariants(&self) -> Result<(), DecompError> {
        check_len("transpose.invariants", "sends", self.grid.size(), self.sends.len())?;
        check_len("transpose.invariants", "recvs", self.grid.size(), self.recvs.len())?;
        check_partition("sends", &self.sends, self.send_len)?;
        check_partition("recvs", &self.recvs, self.recv_len)
    }
}

/// The slots must tile `0..len` exactly: no gaps, no overlaps.
fn check_partition(arg: &'static str, slots: &[PeerSlot], len: usize) -> Result<(), DecompError> {
    const OP: &str = "transpose.invariants";
    let mut runs = Vec::new();
    for slot in slots {
        slot.for_each_run(|off, n| runs.push((off, n)));
    }
    runs.sort_unstable();
    if let Some(&(off, _)) = runs.first().filter(|r| r.0 != 0) {
        return Err(DecompError::invalid(OP, arg, format!("first byte covered is {off}")));
    }
    if let Some(((a, n), (b, _))) = runs.iter().tuple_windows().find(|((a, n), (b, _))| a + n != *b) {
        return Err(DecompError::invalid(
            OP,
            arg,
            format!("run {a}..{} is followed by a run at {b}", a + n),
        ));
    }
    let end = runs.last().map_or(0, |&(off, n)| off + n);
    if end != len {
        return Err(DecompError::invalid(
            OP,
            arg,
            format!("runs cover {end} of {len} bytes"),
        ));
    }
    Ok(())
}

/// Every logical axis must offer at least one point per process along it,
/// in both pencils of the plan.
fn check_feasible<C: Communicator>(
    op: &'static str,
    decomp: &Decomposition<C>,
    pencil: Pencil,
    glsizes: &[usize],
) -> Result<(), DecompError> {
    for &axis in Axis::all_for(decomp.ndims()) {
        let nprocs = decomp.nprocs(pencil, axis)?;
        let glsize = glsizes[axis as usize];
        if glsize < nprocs {
            return Err(reject(DecompError::infeasible(
                op,
                format!("{axis} extent {glsize} is split over {nprocs} processes in pencil {pencil}"),
            )));
        }
    }
    Ok(())
}

/// Byte size of this process's buffer in `pencil`.
fn buffer_len<C: Communicator>(
    op: &'static str,
    decomp: &Decomposition<C>,
    pencil: Pencil,
    glsizes: &[usize],
    size_of_element: usize,
) -> Result<usize, DecompError> {
    let block = decomp.pencil_block(pencil, glsizes)?;
    block
        .sizes()
        .iter()
        .try_fold(size_of_element, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| {
            reject(DecompError::overflow(
                op,
                "glsizes",
                format!("local {pencil} buffer of {:?} elements is too large", block.sizes()),
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::decomp_error::ErrorKind;
    use crate::topology::decomposition::DecompConfig;

    fn serial(ndims: usize) -> Decomposition<NoComm> {
        Decomposition::construct(NoComm, &DecompConfig::new(ndims)).unwrap()
    }

    #[test]
    fn serial_2d_transpose_swaps_axes() {
        let d = serial(2);
        let plan = TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &[3, 2], 1).unwrap();
        assert_eq!((plan.send_len(), plan.recv_len()), (6, 6));
        // x fastest in, y fastest out
        let src = [0u8, 1, 2, 10, 11, 12];
        let mut dst = [0u8; 6];
        plan.execute(&src, &mut dst).unwrap();
        assert_eq!(dst, [0, 10, 1, 11, 2, 12]);
        plan.validate_invariants().unwrap();
        plan.destruct();
    }

    #[test]
    fn construct_rejects_in_order() {
        let d = serial(3);
        let kind = |r: Result<TransposePlan<NoComm>, DecompError>| r.unwrap_err().kind();
        assert_eq!(
            kind(TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &[4, 4, 4], 0)),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            kind(TransposePlan::construct(&d, Pencil::X1, Pencil::Z1, &[4, 4, 4], 8)),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            kind(TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &[4, 4], 8)),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            kind(TransposePlan::construct(
                &d,
                Pencil::X1,
                Pencil::Y1,
                &[4, 4, i32::MAX as usize + 1],
                8
            )),
            ErrorKind::Overflow
        );
        assert_eq!(
            kind(TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &[4, 0, 4], 8)),
            ErrorKind::Infeasible
        );
    }

    #[test]
    fn peer_shares_beyond_32_bit_counts_overflow() {
        // 2^31 one-byte elements in the single peer's share
        let d = serial(3);
        let err = TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &[1 << 16, 1 << 15, 1], 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        let d = serial(2);
        let err =
            TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &[1 << 16, 1 << 15], 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "[invariants]")]
    fn overlapping_slots_trip_the_debug_check() {
        let d = serial(2);
        let mut plan = TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &[4, 5], 8).unwrap();
        plan.sends[0].displ += 8;
        plan.debug_assert_invariants();
    }

    #[test]
    fn typed_execution_checks_element_type() {
        let d = serial(3);
        let plan = TransposePlan::construct(&d, Pencil::X1, Pencil::Y1, &[2, 3, 4], 8).unwrap();
        let src: Vec<f64> = (0..24).map(f64::from).collect();
        let mut dst = vec![0.0f64; 24];
        plan.execute_typed(&src, &mut dst).unwrap();
        // Y1 stores y fastest, then z, then x
        assert_eq!(dst[1], 2.0);
        assert_eq!(dst[3], 6.0);
        assert_eq!(dst[12], 1.0);
        let mut narrow = vec![0u32; 48];
        let wide: Vec<u32> = vec![0; 48];
        assert!(plan.execute_typed(&wide, &mut narrow).is_err());
    }

    #[test]
    fn wrong_buffer_lengths_are_rejected() {
        let d = serial(2);
        let plan = TransposePlan::construct(&d, Pencil::Y1, Pencil::X1, &[4, 5], 2).unwrap();
        let mut dst = vec![0u8; 40];
        assert!(plan.execute(&[0u8; 39], &mut dst).is_err());
        assert!(plan.execute(&[0u8; 40], &mut dst[..20]).is_err());
        assert!(plan.execute(&[0u8; 40], &mut dst).is_ok());
    }

    #[test]
    fn broken_partition_is_reported() {
        use crate::data::region::Region;
        let slot = |displ, len| PeerSlot {
            count: 1,
            displ,
            region: Region::contiguous(len),
        };
        assert!(check_partition("sends", &[slot(0, 4), slot(4, 4)], 8).is_ok());
        assert!(check_partition("sends", &[slot(0, 4), slot(5, 3)], 8).is_err());
        assert!(check_partition("sends", &[slot(0, 4), slot(3, 5)], 8).is_err());
        assert!(check_partition("sends", &[slot(1, 7)], 8).is_err());
        assert!(check_partition("sends", &[slot(0, 4)], 8).is_err());
    }
}
