//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! All handles are **waitable** but non-blocking: the exchange calls
//! `.wait()` before it trusts that a buffer is ready.

use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Non-blocking communication interface over a flat group of processes.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// Rank of this process in the group.
    fn rank(&self) -> usize;
    /// Number of processes in the group.
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of `len` bytes; the payload is handed back by `wait`.
    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Self::RecvHandle;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

/// Typed message tag. Each transpose plan draws its own tag so concurrent
/// plans over the same group never match each other's messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommTag(u16);

impl CommTag {
    pub const fn new(raw: u16) -> Self {
        CommTag(raw)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Tag `n` steps after this one.
    pub const fn offset(self, n: u16) -> Self {
        CommTag(self.0.wrapping_add(n))
    }
}

/// Compile-time no-op comm for pure serial use: a group of one.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _len: usize) {}
}

// --- ThreadComm: intra-process / multi-thread ---
type Key = (usize, usize, u16); // (src, dst, tag)

/// Longest a thread-backed receive waits before reporting a missing message.
const RECV_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct Mailbox {
    slots: Mutex<HashMap<Key, VecDeque<Bytes>>>,
    arrived: Condvar,
}

/// One member of an in-process group whose processes are threads.
///
/// Messages between a pair of ranks with the same tag are delivered in the
/// order they were sent.
#[derive(Clone, Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

pub struct ThreadRecv {
    key: Key,
    len: usize,
    mailbox: Arc<Mailbox>,
}

impl ThreadComm {
    /// All `size` members of a fresh group, indexed by rank.
    pub fn universe(size: usize) -> Vec<ThreadComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }

    /// Run `f` once per rank of a fresh `size`-member group, each on its own
    /// thread, and collect the results in rank order.
    pub fn run<R, F>(size: usize, f: F) -> Vec<R>
    where
        F: Fn(ThreadComm) -> R + Sync,
        R: Send,
    {
        let comms = Self::universe(size);
        std::thread::scope(|s| {
            let f = &f;
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| s.spawn(move || f(comm)))
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}

impl Wait for ThreadRecv {
    fn wait(self) -> Option<Vec<u8>> {
        let mut slots = self.mailbox.slots.lock();
        loop {
            let popped = slots.get_mut(&self.key).and_then(|queue| {
                let bytes = queue.pop_front();
                Some((bytes?, queue.is_empty()))
            });
            if let Some((bytes, drained)) = popped {
                if drained {
                    slots.remove(&self.key);
                }
                if bytes.len() != self.len {
                    log::warn!(
                        "message {:?} carries {} bytes, {} were posted",
                        self.key,
                        bytes.len(),
                        self.len
                    );
                }
                return Some(bytes.to_vec());
            }
            if self
                .mailbox
                .arrived
                .wait_for(&mut slots, RECV_TIMEOUT)
                .timed_out()
            {
                return None;
            }
        }
    }
}

impl Communicator for ThreadComm {
    type SendHandle = ();
    type RecvHandle = ThreadRecv;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag);
        self.mailbox
            .slots
            .lock()
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        self.mailbox.arrived.notify_all();
    }

    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Self::RecvHandle {
        ThreadRecv {
            key: (peer, self.rank, tag),
            len,
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use crate::decomp_error::DecompError;
    use mpi::environment::Universe;
    use mpi::request::StaticScope;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{Communicator as _, Destination as _, Source as _};
    use std::rc::Rc;

    struct MpiInner {
        world: SimpleCommunicator,
        // keeps MPI initialised for as long as any clone is alive
        _universe: Universe,
    }

    /// World communicator of an MPI job.
    #[derive(Clone)]
    pub struct MpiComm {
        inner: Rc<MpiInner>,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        /// Initialise MPI and wrap its world communicator.
        pub fn new() -> Result<Self, DecompError> {
            let universe = mpi::initialize().ok_or_else(|| DecompError::Fatal {
                op: "comm.init",
                peer: 0,
                reason: "MPI is already initialised or failed to start".into(),
            })?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                inner: Rc::new(MpiInner {
                    world,
                    _universe: universe,
                }),
                rank,
                size,
            })
        }
    }

    /// Pending request plus the heap buffer it reads from or writes into.
    pub struct MpiHandle {
        pending: Option<Box<dyn FnOnce()>>,
        buf: Option<*mut [u8]>,
        received: bool,
    }

    impl MpiHandle {
        fn new<F>(buf: Box<[u8]>, received: bool, post: F) -> Self
        where
            F: FnOnce(&'static mut [u8]) -> Box<dyn FnOnce()>,
        {
            let buf = Box::into_raw(buf);
            // SAFETY: `buf` stays allocated until `complete` reclaims it, and
            // the request is waited on before that happens.
            let pending = post(unsafe { &mut *buf });
            MpiHandle {
                pending: Some(pending),
                buf: Some(buf),
                received,
            }
        }

        fn complete(&mut self) -> Option<Box<[u8]>> {
            if let Some(wait) = self.pending.take() {
                wait();
            }
            // SAFETY: the request has completed, nothing else refers to `buf`.
            self.buf.take().map(|buf| unsafe { Box::from_raw(buf) })
        }
    }

    impl Wait for MpiHandle {
        fn wait(mut self) -> Option<Vec<u8>> {
            let data = self.complete()?;
            self.received.then(|| data.into_vec())
        }
    }

    impl Drop for MpiHandle {
        fn drop(&mut self) {
            drop(self.complete());
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            // group ranks are below `world.size()`, an i32
            let process = self.inner.world.process_at_rank(peer as i32);
            MpiHandle::new(buf.into(), false, |data| {
                let request = process.immediate_send_with_tag(StaticScope, &*data, tag as i32);
                Box::new(move || {
                    request.wait();
                })
            })
        }

        fn irecv(&self, peer: usize, tag: u16, len: usize) -> MpiHandle {
            let process = self.inner.world.process_at_rank(peer as i32);
            MpiHandle::new(vec![0u8; len].into_boxed_slice(), true, |data| {
                let request = process.immediate_receive_into_with_tag(StaticScope, data, tag as i32);
                Box::new(move || {
                    request.wait();
                })
            })
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::{MpiComm, MpiHandle};
