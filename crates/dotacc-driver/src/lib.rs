// SPDX-License-Identifier: AGPL-3.0-only

//! Driver for the LiteX dot-product accelerator.
//!
//! The accelerator multiplies four Q16.16 inputs by four Q16.16 weights and
//! exposes the sum on a single result register. This crate turns it into a
//! general `f64` dot product: vectors are cut into 4-element chunks, each
//! chunk goes through the accelerator (or a CPU fallback), and the chunk
//! results are accumulated in 64 bits.
//!
//! # Backend hierarchy
//!
//! ```text
//! Hardware:
//!   HardwareBackend<MappedRegion>          — CSR block mapped from /dev/mem, UIO or PCIe BAR
//!
//! Simulation (CI, parity checks):
//!   HardwareBackend<SimulatedAccelerator>  — same register protocol, in-process datapath
//!
//! Fallback (accelerator absent):
//!   SoftwareBackend                        — f64 multiply, Q16.16 encode, no register I/O
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use dotacc_driver::{AccelConfig, DotProductEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AccelConfig::from_env()?;
//! let mut engine = DotProductEngine::from_config(&config)?;
//! engine.initialize();
//!
//! let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
//! let w = [0.5; 8];
//! println!("{} on {}", engine.dot_product(x.len(), &x, &w), engine.backend_type());
//! # Ok(())
//! # }
//! ```
//!
//! # Limits
//!
//! - Only whole chunks are computed: `size % 4` trailing elements are ignored.
//! - No overflow detection: elements with `|x| >= 2^15`, and chunks whose sum
//!   exceeds Q16.16, wrap.
//! - One accelerator, one owner: the engine holds the register mapping
//!   exclusively. Share it across threads behind a `Mutex`.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod backend;
pub mod backends;
pub mod classifier;
pub mod config;
mod engine;
mod error;
pub mod fixed;
pub mod mmio;
pub mod sim;

/// Register model constants (re-exported from dotacc-chip).
pub mod chip {
    pub use dotacc_chip::format::{CHUNK_WIDTH, FRACTIONAL_BITS, RESOLUTION};
    pub use dotacc_chip::regs::{RegisterMap, BLOCK_SIZE, CSR_PREFIX, WORD_STRIDE};
}

pub use backend::{select_backend, BackendSelection, BackendType, ChunkBackend};
pub use backends::{HardwareBackend, SoftwareBackend};
pub use classifier::LogisticModel;
pub use config::{AccelConfig, CsrMap};
pub use engine::DotProductEngine;
pub use error::{AccelError, Result};
pub use fixed::{from_fixed, from_fixed64, to_fixed};
pub use mmio::{MappedRegion, RegisterIo};
pub use sim::{RegisterAccess, SimulatedAccelerator};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        AccelConfig, AccelError, BackendSelection, BackendType, ChunkBackend, DotProductEngine,
        HardwareBackend, LogisticModel, Result, SimulatedAccelerator, SoftwareBackend,
    };
}
