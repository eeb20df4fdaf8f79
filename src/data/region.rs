//! Strided memory regions inside a flat byte buffer.
//!
//! A [`Region`] names a set of byte positions relative to a base offset and,
//! just as importantly, the order in which they are visited. A strided region
//! is `count` blocks whose starts are `stride` bytes apart; each block is
//! `block_len` back-to-back copies of the inner region, one copy every
//! `inner.extent()` bytes. Visiting goes block by block, copy by copy,
//! recursively, so the k-th byte packed by a sender's region lands at the
//! k-th byte of the receiver's region.
//!
//! Regions know nothing about messaging; [`crate::algs::exchange`] pairs them
//! with peers.

use crate::decomp_error::DecompError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    /// `len` consecutive bytes.
    Contiguous { len: usize },
    /// `count` blocks of `block_len` copies of `inner`, block starts `stride` bytes apart.
    Strided {
        count: usize,
        block_len: usize,
        stride: usize,
        inner: Box<Region>,
    },
}

/// One peer's share of a buffer: `count` back-to-back copies of `region`
/// starting `displ` bytes into the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSlot {
    pub count: usize,
    pub displ: usize,
    pub region: Region,
}

impl Region {
    pub fn contiguous(len: usize) -> Self {
        Region::Contiguous { len }
    }

    pub fn strided(count: usize, block_len: usize, stride: usize, inner: Region) -> Self {
        Region::Strided {
            count,
            block_len,
            stride,
            inner: Box::new(inner),
        }
    }

    /// Distance from the first byte to one past the last byte.
    pub fn extent(&self) -> usize {
        match self {
            Region::Contiguous { len } => *len,
            Region::Strided {
                count,
                block_len,
                stride,
                inner,
            } => {
                if *count == 0 || *block_len == 0 {
                    0
                } else {
                    (count - 1) * stride + block_len * inner.extent()
                }
            }
        }
    }

    /// Number of bytes the region selects.
    pub fn size(&self) -> usize {
        match self {
            Region::Contiguous { len } => *len,
            Region::Strided {
                count,
                block_len,
                inner,
                ..
            } => count * block_len * inner.size(),
        }
    }

    fn walk(&self, base: usize, visit: &mut impl FnMut(usize, usize)) {
        match self {
            Region::Contiguous { len } => {
                if *len > 0 {
                    visit(base, *len)
                }
            }
            Region::Strided {
                count,
                block_len,
                stride,
                inner,
            } => {
                let step = inner.extent();
                for c in 0..*count {
                    for b in 0..*block_len {
                        inner.walk(base + c * stride + b * step, visit);
                    }
                }
            }
        }
    }

    /// Call `f(offset, len)` for every maximal run of consecutive bytes, in
    /// visiting order, with offsets shifted by `displ`.
    pub fn for_each_run(&self, displ: usize, mut f: impl FnMut(usize, usize)) {
        let mut pending: Option<(usize, usize)> = None;
        self.walk(displ, &mut |off, len| match pending {
            Some((start, run)) if start + run == off => pending = Some((start, run + len)),
            Some((start, run)) => {
                f(start, run);
                pending = Some((off, len));
            }
            None => pending = Some((off, len)),
        });
        if let Some((start, run)) = pending {
            f(start, run);
        }
    }

    /// Offset of the `k`-th visited byte, `k < self.size()`.
    fn locate(&self, k: usize) -> usize {
        match self {
            Region::Contiguous { .. } => k,
            Region::Strided {
                block_len,
                stride,
                inner,
                ..
            } => {
                let copy = inner.size();
                let block = block_len * copy;
                let (c, rem) = (k / block, k % block);
                c * stride + (rem / copy) * inner.extent() + inner.locate(rem % copy)
            }
        }
    }

    /// Bytes that follow the `k`-th visited byte back to back in memory,
    /// itself included.
    fn run_from(&self, k: usize) -> usize {
        match self {
            Region::Contiguous { len } => len - k,
            Region::Strided {
                block_len, inner, ..
            } => {
                let copy = inner.size();
                let block = block_len * copy;
                if inner.extent() == copy {
                    block - k % block
                } else {
                    inner.run_from(k % block % copy)
                }
            }
        }
    }

    /// Runs as `(offset, len)` pairs.
    pub fn runs(&self, displ: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        self.for_each_run(displ, |off, len| out.push((off, len)));
        out
    }
}

impl PeerSlot {
    /// Bytes selected by the slot.
    pub fn size(&self) -> usize {
        self.count * self.region.size()
    }

    /// One past the last byte the slot touches.
    pub fn end(&self) -> usize {
        if self.count == 0 {
            return self.displ;
        }
        self.displ + (self.count - 1) * self.region.extent() + self.region.extent()
    }

    pub fn for_each_run(&self, mut f: impl FnMut(usize, usize)) {
        let step = self.region.extent();
        for k in 0..self.count {
            self.region.for_each_run(self.displ + k * step, &mut f);
        }
    }

    /// Gather the slot's bytes from `src` in visiting order.
    pub fn pack(&self, op: &'static str, src: &[u8]) -> Result<Vec<u8>, DecompError> {
        self.check_bounds(op, "sendbuf", src.len())?;
        let mut out = Vec::new();
        out.try_reserve_exact(self.size())
            .map_err(|_| DecompError::OutOfMemory {
                op,
                what: "send staging buffer",
            })?;
        self.for_each_run(|off, len| out.extend_from_slice(&src[off..off + len]));
        Ok(out)
    }

    /// Scatter `data` into `dst` in visiting order. `data` must hold exactly
    /// [`PeerSlot::size`] bytes.
    pub fn unpack(&self, op: &'static str, data: &[u8], dst: &mut [u8]) -> Result<(), DecompError> {
        self.check_bounds(op, "recvbuf", dst.len())?;
        if data.len() != self.size() {
            return Err(DecompError::invalid(
                op,
                "data",
                format!("expected {} bytes, got {}", self.size(), data.len()),
            ));
        }
        let mut cursor = 0;
        self.for_each_run(|off, len| {
            dst[off..off + len].copy_from_slice(&data[cursor..cursor + len]);
            cursor += len;
        });
        Ok(())
    }

    /// Copy this slot's bytes from `src` straight into `to`'s positions in
    /// `dst`, pairing the k-th byte of one with the k-th byte of the other.
    pub fn copy_into(
        &self,
        op: &'static str,
        src: &[u8],
        to: &PeerSlot,
        dst: &mut [u8],
    ) -> Result<(), DecompError> {
        self.check_bounds(op, "sendbuf", src.len())?;
        to.check_bounds(op, "recvbuf", dst.len())?;
        if self.size() != to.size() {
            return Err(DecompError::invalid(
                op,
                "recvs",
                format!("{} bytes sent to self, {} expected", self.size(), to.size()),
            ));
        }
        let mut k = 0;
        self.for_each_run(|mut off, mut len| {
            while len > 0 {
                let (at, room) = to.locate(k);
                let n = room.min(len);
                dst[at..at + n].copy_from_slice(&src[off..off + n]);
                off += n;
                len -= n;
                k += n;
            }
        });
        Ok(())
    }

    /// Offset of the `k`-th visited byte and the length of the run starting there.
    fn locate(&self, k: usize) -> (usize, usize) {
        let size = self.region.size();
        let (copy, rem) = (k / size, k % size);
        (
            self.displ + copy * self.region.extent() + self.region.locate(rem),
            self.region.run_from(rem),
        )
    }

    fn check_bounds(&self, op: &'static str, arg: &'static str, len: usize) -> Result<(), DecompError> {
        if self.end() <= len {
            return Ok(());
        }
        Err(DecompError::invalid(
            op,
            arg,
            format!("region ends at byte {} of a {len}-byte buffer", self.end()),
        ))
    }
}
