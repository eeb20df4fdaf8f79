#![cfg_attr(docsrs, feature(doc_cfg))]
//! # pencil-decomp
//!
//! pencil-decomp splits 2D and 3D global arrays over a Cartesian grid of
//! processes and moves them between "pencil" layouts, in which every process
//! holds a slab that is complete and contiguous along one axis. It is meant
//! for distributed grid-based solvers (spectral methods, ADI and other
//! line-implicit schemes) that need each axis local in turn.
//!
//! ## Features
//! - Near-equal split of every axis, with closed-form sizes and offsets
//! - Six pencil orientations in 3D (X1, Y1, Z1, X2, Y2, Z2), two in 2D
//! - Reusable transpose plans built from strided region descriptors
//! - Pluggable communication backends (serial, in-process threads, MPI)
//!
//! ## Usage
//!
//! ```
//! use pencil_decomp::prelude::*;
//!
//! # fn main() -> Result<(), DecompError> {
//! let decomp = Decomposition::construct(NoComm, &DecompConfig::new(2))?;
//! let glsizes = [4, 5];
//! let plan = TransposePlan::construct(&decomp, Pencil::X1, Pencil::Y1, &glsizes, 8)?;
//! let x1: Vec<f64> = (0..20).map(f64::from).collect();
//! let mut y1 = vec![0.0; 20];
//! plan.execute_typed(&x1, &mut y1)?;
//! assert_eq!(y1[1], 4.0);
//! plan.destruct();
//! decomp.destruct();
//! # Ok(())
//! # }
//! ```
//!
//! Plans and decompositions are built collectively: every process of the
//! group constructs the same sequence of them in the same order.
//!
//! Enable the `mpi-support` feature for the [`MpiComm`](algs::communicator)
//! backend; `check-invariants` validates every plan in release builds too.

pub mod algs;
pub mod data;
pub mod debug_invariants;
pub mod decomp_error;
pub mod topology;
pub mod transpose;

pub use debug_invariants::DebugInvariants;
pub use decomp_error::{DecompError, ErrorKind};

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, NoComm, ThreadComm, Wait};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::decomp_error::{DecompError, ErrorKind};
    pub use crate::topology::decomposition::{DecompConfig, Decomposition};
    pub use crate::topology::geometry::PencilBlock;
    pub use crate::topology::pencil::{Axis, Pencil};
    pub use crate::transpose::TransposePlan;
}
