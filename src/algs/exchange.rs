//! Per-peer structured all-to-all over a process grid.
//!
//! Every grid rank `q` owns one send slot and one receive slot. The exchange
//! posts all receives, packs and posts all sends, then waits on the receives
//! and unpacks them. The slot addressed to this process itself is copied
//! locally without touching the communicator. Every send and receive handle is
//! drained before returning, even if an error occurs.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::data::region::PeerSlot;
use crate::decomp_error::DecompError;
use crate::topology::cartesian::CartTopology;
use crate::topology::validation::{check_len, reject};

/// Exchange `sendbuf` and `recvbuf` contents with every member of `grid`.
///
/// `sends[q]` selects the bytes of `sendbuf` destined for grid rank `q`;
/// `recvs[q]` the positions of `recvbuf` filled by grid rank `q`.
#[allow(clippy::too_many_arguments)]
pub fn all_to_all_w<C: Communicator>(
    op: &'static str,
    comm: &C,
    grid: &CartTopology,
    tag: CommTag,
    sendbuf: &[u8],
    sends: &[PeerSlot],
    recvbuf: &mut [u8],
    recvs: &[PeerSlot],
) -> Result<(), DecompError> {
    check_len(op, "sends", grid.size(), sends.len())?;
    check_len(op, "recvs", grid.size(), recvs.len())?;
    let me = grid.rank();

    // 1) post all receives
    let mut pending_recvs = Vec::with_capacity(grid.size());
    for (q, slot) in recvs.iter().enumerate() {
        if q == me || slot.size() == 0 {
            continue;
        }
        let peer = grid.member(q);
        pending_recvs.push((q, peer, comm.irecv(peer, tag.as_u16(), slot.size())));
    }

    // 2) pack and post all sends; the staging buffers live until the drain
    let mut pending_sends = Vec::with_capacity(grid.size());
    let mut staged = Vec::with_capacity(grid.size());
    let mut maybe_err = None;
    for (q, slot) in sends.iter().enumerate() {
        if q == me || slot.size() == 0 {
            continue;
        }
        match slot.pack(op, sendbuf) {
            Ok(bytes) => {
                pending_sends.push(comm.isend(grid.member(q), tag.as_u16(), &bytes));
                staged.push(bytes);
            }
            Err(e) => {
                maybe_err.get_or_insert(e);
            }
        }
    }

    // 3) local share
    if maybe_err.is_none() {
        if let Err(e) = sends[me].copy_into(op, sendbuf, &recvs[me], recvbuf) {
            maybe_err = Some(e);
        }
    }

    // 4) wait for all recvs, unpack (but do not early-return)
    for (q, peer, h) in pending_recvs {
        let expected = recvs[q].size();
        match h.wait() {
            Some(data) if data.len() == expected => {
                if maybe_err.is_none() {
                    if let Err(e) = recvs[q].unpack(op, &data, recvbuf) {
                        maybe_err = Some(e);
                    }
                }
            }
            Some(data) if maybe_err.is_none() => {
                maybe_err = Some(DecompError::Fatal {
                    op,
                    peer,
                    reason: format!("expected {expected} bytes, got {}", data.len()),
                });
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(DecompError::Fatal {
                    op,
                    peer,
                    reason: format!("failed to receive {expected} bytes"),
                });
            }
            _ => {} // already have an error; just drain
        }
    }

    // 5) always drain all send handles before returning
    for send in pending_sends {
        let _ = send.wait();
    }
    drop(staged);

    match maybe_err {
        Some(err) => Err(reject(err)),
        None => Ok(()),
    }
}
