//! Process grids and pencil bookkeeping.
//!
//! This module provides:
//! - the Cartesian process grid and its sub-grids ([`cartesian`])
//! - pencil and axis tags with the tables mapping them onto grid axes ([`pencil`])
//! - the decomposition context that ties a grid to a communicator ([`decomposition`])
//! - per-process block geometry ([`geometry`])
//! - the argument checks shared by every entry point ([`validation`])

pub mod cartesian;
pub mod decomposition;
pub mod geometry;
pub mod pencil;
pub mod validation;

pub use cartesian::{CartTopology, CartesianLayout};
pub use decomposition::{DecompConfig, Decomposition};
pub use geometry::PencilBlock;
pub use pencil::{Axis, Pencil, Rotation};
