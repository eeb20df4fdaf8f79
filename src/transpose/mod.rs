//! Pencil-to-pencil transposes.
//!
//! A [`TransposePlan`] is built once per (source, destination) pencil pair
//! and executed any number of times. Building is collective: every process of
//! the decomposition must construct the same plans in the same order.

pub mod plan;
mod plan_2d;
mod plan_3d;

pub use plan::TransposePlan;
