// SPDX-License-Identifier: AGPL-3.0-only

//! Software chunk backend
//!
//! Computes the chunk without touching any register:
//!
//! ```text
//! result = Σ_i to_fixed(input_i × weight_i)        (32-bit wrapping sum)
//! ```
//!
//! The product is formed in `f64` and encoded once. The hardware path encodes
//! input and weight separately and multiplies in fixed point, so the two
//! disagree in the last few bits of each product. Both orders are kept as-is:
//! unifying them would silently change results on one side.

use crate::backend::{BackendType, ChunkBackend};
use crate::fixed::{to_fixed, FRACTIONAL_BITS};

/// CPU fallback used when no accelerator is present
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareBackend;

impl SoftwareBackend {
    /// Create a software backend
    pub const fn new() -> Self {
        Self
    }
}

impl ChunkBackend for SoftwareBackend {
    fn initialize(&mut self) {}

    fn compute_chunk(&mut self, inputs: &[f64], weights: &[f64], chunk_size: usize) -> i32 {
        inputs[..chunk_size]
            .iter()
            .zip(&weights[..chunk_size])
            .fold(0i32, |acc, (&x, &w)| acc.wrapping_add(to_fixed(x * w, FRACTIONAL_BITS)))
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Software
    }
}
