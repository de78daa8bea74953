// SPDX-License-Identifier: AGPL-3.0-only

//! Chunked dot-product engine
//!
//! Splits a vector pair into accelerator-width chunks, lets the active
//! backend compute each chunk in Q16.16, and accumulates the chunk results
//! in 64 bits so long vectors do not overflow the 32-bit result register.
//!
//! ```text
//! acc = 0i64
//! for chunk in 0..size/4:  acc += compute_chunk(inputs[4c..4c+4], weights[4c..4c+4]) as i64
//! return acc / 2^16
//! ```
//!
//! `size % 4` trailing elements never reach a backend and do not contribute.

use crate::backend::{select_backend, BackendType, ChunkBackend};
use crate::config::AccelConfig;
use crate::error::Result;
use crate::fixed::{from_fixed64, FRACTIONAL_BITS};
use dotacc_chip::format::CHUNK_WIDTH;
use tracing::{debug, trace};

/// Dot-product engine over one chunk backend
///
/// The backend is fixed at construction. The engine holds no state between
/// calls apart from whatever the backend's registers retain.
#[derive(Debug)]
pub struct DotProductEngine {
    backend: Box<dyn ChunkBackend>,
}

impl DotProductEngine {
    /// Engine over an already constructed backend
    pub fn new(backend: Box<dyn ChunkBackend>) -> Self {
        debug!("Dot-product engine on {} backend", backend.backend_type());
        Self { backend }
    }

    /// Engine over the backend `config` selects
    ///
    /// # Errors
    ///
    /// Returns error if the configuration forces a hardware backend that
    /// cannot be brought up.
    pub fn from_config(config: &AccelConfig) -> Result<Self> {
        select_backend(config).map(Self::new)
    }

    /// Engine on the CPU fallback
    pub fn software() -> Self {
        Self::new(Box::new(crate::backends::SoftwareBackend::new()))
    }

    /// Active backend type
    pub fn backend_type(&self) -> BackendType {
        self.backend.backend_type()
    }

    /// Clear accelerator state (no-op without hardware)
    pub fn initialize(&mut self) {
        self.backend.initialize();
    }

    /// Dot product of the first `size` element pairs
    ///
    /// Only `size / 4` whole chunks are processed; the remaining
    /// `size % 4` elements are dropped. Values whose Q16.16 encoding (or
    /// whose chunk sum) exceeds 32 bits wrap silently.
    ///
    /// # Panics
    ///
    /// Panics if `inputs` or `weights` is shorter than `size`.
    pub fn dot_product(&mut self, size: usize, inputs: &[f64], weights: &[f64]) -> f64 {
        assert!(
            inputs.len() >= size && weights.len() >= size,
            "dot_product: size {size} exceeds inputs ({}) or weights ({})",
            inputs.len(),
            weights.len()
        );

        let chunks = size / CHUNK_WIDTH;
        let mut acc = 0i64;
        for (index, (x, w)) in inputs[..chunks * CHUNK_WIDTH]
            .chunks_exact(CHUNK_WIDTH)
            .zip(weights[..chunks * CHUNK_WIDTH].chunks_exact(CHUNK_WIDTH))
            .enumerate()
        {
            let partial = self.backend.compute_chunk(x, w, CHUNK_WIDTH);
            trace!(chunk = index, partial, "chunk computed");
            acc += i64::from(partial);
        }

        if size % CHUNK_WIDTH != 0 {
            trace!(dropped = size % CHUNK_WIDTH, "trailing elements ignored");
        }

        from_fixed64(acc, FRACTIONAL_BITS)
    }
}
