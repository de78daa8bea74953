// SPDX-License-Identifier: AGPL-3.0-only

//! Chunk backend implementations
//!
//! - **Hardware**: writes the chunk to the CSR block and reads the combinational
//!   result (over a [`crate::MappedRegion`] or a [`crate::SimulatedAccelerator`])
//! - **Software**: multiplies in `f64`, encodes each product, sums in Q16.16
//!
//! The two paths round differently and are only approximately equal; see
//! `tests/backend_parity.rs` for the bound.

pub mod hardware;
pub mod software;

pub use hardware::HardwareBackend;
pub use software::SoftwareBackend;
