//! Data module: memory region descriptors

/// Strided byte regions and per-peer slots.
pub mod region;

pub use region::{PeerSlot, Region};
