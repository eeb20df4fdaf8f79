#![allow(dead_code)]
use pencil_decomp::algs::wire::{read_index, stamp_index, truncated_index};
use pencil_decomp::prelude::*;

/// Decomposition with an automatic grid.
pub fn auto_decomp<C: Communicator>(comm: C, ndims: usize) -> Decomposition<C> {
    Decomposition::construct(comm, &DecompConfig::new(ndims)).unwrap()
}

/// Local buffer whose elements carry their global linear index.
pub fn stamped(block: &PencilBlock, elem: usize) -> Vec<u8> {
    let mut buf = vec![0u8; block.len() * elem];
    for (i, chunk) in buf.chunks_exact_mut(elem).enumerate() {
        stamp_index(chunk, block.global_index(i) as u64);
    }
    buf
}

/// Every element of `buf` must carry its own global linear index.
pub fn assert_stamped(block: &PencilBlock, buf: &[u8], elem: usize) {
    assert_eq!(buf.len(), block.len() * elem, "buffer length");
    for (i, chunk) in buf.chunks_exact(elem).enumerate() {
        let want = truncated_index(block.global_index(i) as u64, elem);
        assert_eq!(
            read_index(chunk),
            want,
            "{} element {i} at local {:?}",
            block.pencil(),
            block.local_indices(i)
        );
    }
}

/// Global indices in the order `slot` visits them in a stamped buffer.
pub fn visited_indices(slot: &pencil_decomp::data::PeerSlot, buf: &[u8], elem: usize) -> Vec<u64> {
    let mut out = Vec::new();
    slot.for_each_run(|off, len| {
        for chunk in buf[off..off + len].chunks_exact(elem) {
            out.push(read_index(chunk));
        }
    });
    out
}
