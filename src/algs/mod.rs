//! Index arithmetic, messaging backends and the all-to-all exchange.

pub mod communicator;
pub mod exchange;
pub mod kernel;
pub mod wire;

pub use kernel::{local_extent, local_offset, local_split};
