// SPDX-License-Identifier: AGPL-3.0-only

//! Hardware chunk backend
//!
//! Register protocol for one chunk:
//!
//! ```text
//! write input[0..4]    (encoded, zero-filled past count)
//! write weight[0..4]   (encoded, zero-filled past count)
//! read  result         (valid immediately: the datapath is combinational)
//! ```
//!
//! Both blocks are rewritten in full on every chunk, so nothing from a
//! previous chunk survives into the next result. Counts above the chunk width
//! are clamped and the excess elements dropped.

use crate::backend::{BackendType, ChunkBackend};
use crate::fixed::{from_word, to_fixed, to_word, FRACTIONAL_BITS};
use crate::mmio::RegisterIo;
use crate::sim::SimulatedAccelerator;
use dotacc_chip::format::CHUNK_WIDTH;
use dotacc_chip::regs::{RegisterMap, WORD_STRIDE};

/// Chunk backend driving the accelerator CSR block
///
/// Owns the register handle: one backend per accelerator instance.
#[derive(Debug)]
pub struct HardwareBackend<R: RegisterIo> {
    regs: R,
    map: RegisterMap,
    kind: BackendType,
}

impl<R: RegisterIo> HardwareBackend<R> {
    /// Backend over `regs` with the default register layout
    pub fn new(regs: R) -> Self {
        Self::with_map(regs, RegisterMap::DEFAULT)
    }

    /// Backend over `regs` with an explicit register layout
    pub fn with_map(regs: R, map: RegisterMap) -> Self {
        tracing::debug!(
            "Hardware backend: input={:#x} weight={:#x} result={:#x}",
            map.input,
            map.weight,
            map.result
        );
        Self { regs, map, kind: BackendType::Hardware }
    }

    /// Register layout in use
    pub const fn register_map(&self) -> &RegisterMap {
        &self.map
    }

    /// Borrow the register handle
    pub const fn registers(&self) -> &R {
        &self.regs
    }

    /// Mutably borrow the register handle
    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Release the register handle
    pub fn into_inner(self) -> R {
        self.regs
    }

    /// Encode up to `CHUNK_WIDTH` values, zero-filling the rest
    fn encode_block(values: &[f64], count: usize) -> [u32; CHUNK_WIDTH] {
        let mut words = [0u32; CHUNK_WIDTH];
        let count = count.min(CHUNK_WIDTH);
        for (word, &value) in words.iter_mut().zip(&values[..count]) {
            *word = to_word(to_fixed(value, FRACTIONAL_BITS));
        }
        words
    }

    fn write_block(&mut self, base: usize, words: &[u32; CHUNK_WIDTH]) {
        for (i, &word) in words.iter().enumerate() {
            self.regs.write32(base + i * WORD_STRIDE, word);
        }
    }

    /// Write `count` inputs (clamped to the chunk width) to the input block
    ///
    /// # Panics
    ///
    /// Panics if `values` holds fewer than `min(count, CHUNK_WIDTH)` elements.
    pub fn set_inputs(&mut self, values: &[f64], count: usize) {
        let words = Self::encode_block(values, count);
        self.write_block(self.map.input, &words);
    }

    /// Write `count` weights (clamped to the chunk width) to the weight block
    ///
    /// # Panics
    ///
    /// Panics if `values` holds fewer than `min(count, CHUNK_WIDTH)` elements.
    pub fn set_weights(&mut self, values: &[f64], count: usize) {
        let words = Self::encode_block(values, count);
        self.write_block(self.map.weight, &words);
    }

    /// Read the result register
    pub fn get_result(&mut self) -> i32 {
        from_word(self.regs.read32(self.map.result))
    }
}

impl HardwareBackend<SimulatedAccelerator> {
    /// Backend over the in-process model, at the simulator's register layout
    pub fn simulated(sim: SimulatedAccelerator) -> Self {
        let map = *sim.register_map();
        Self { kind: BackendType::Simulated, ..Self::with_map(sim, map) }
    }
}

impl<R: RegisterIo> ChunkBackend for HardwareBackend<R> {
    fn initialize(&mut self) {
        let zeros = [0u32; CHUNK_WIDTH];
        self.write_block(self.map.input, &zeros);
        self.write_block(self.map.weight, &zeros);
        tracing::debug!("Cleared accelerator input and weight registers");
    }

    fn compute_chunk(&mut self, inputs: &[f64], weights: &[f64], chunk_size: usize) -> i32 {
        self.set_inputs(inputs, chunk_size);
        self.set_weights(weights, chunk_size);
        self.get_result()
    }

    fn backend_type(&self) -> BackendType {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::from_fixed;
    use crate::sim::RegisterAccess;
    use dotacc_chip::regs::{INPUT_BASE, RESULT, WEIGHT_BASE};

    fn backend() -> HardwareBackend<SimulatedAccelerator> {
        HardwareBackend::simulated(SimulatedAccelerator::new().with_access_log())
    }

    #[test]
    fn full_chunk() {
        let mut hw = backend();
        let r = hw.compute_chunk(&[1.0, 2.0, 3.0, 4.0], &[0.5, 0.5, 0.5, 0.5], 4);
        assert!((from_fixed(r, 16) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn count_is_clamped() {
        let mut hw = backend();
        let inputs = [1.0; 8];
        let weights = [1.0; 8];
        let r = hw.compute_chunk(&inputs, &weights, 8);
        assert_eq!(r, to_fixed(4.0, 16));
        // Only the four block registers of each kind were touched
        let writes = hw.registers().access_log().iter().filter(|a| a.is_write()).count();
        assert_eq!(writes, 2 * CHUNK_WIDTH);
    }

    #[test]
    fn short_chunk_zero_fills() {
        let mut hw = backend();
        let _ = hw.compute_chunk(&[9.0, 9.0, 9.0, 9.0], &[9.0, 9.0, 9.0, 9.0], 4);
        let _ = hw.compute_chunk(&[1.0, 2.0], &[3.0, 4.0], 2);
        assert_eq!(hw.registers().inputs(), [to_fixed(1.0, 16), to_fixed(2.0, 16), 0, 0]);
        assert_eq!(hw.registers().weights(), [to_fixed(3.0, 16), to_fixed(4.0, 16), 0, 0]);
    }

    #[test]
    fn consecutive_short_chunks_do_not_contaminate() {
        let mut hw = backend();
        let first = hw.compute_chunk(&[1.0, 1.0, 5.0], &[1.0, 1.0, 5.0], 3);
        let second = hw.compute_chunk(&[2.0, 3.0], &[2.0, 3.0], 2);
        assert_eq!(first, to_fixed(27.0, 16));
        assert_eq!(second, to_fixed(13.0, 16));
    }

    #[test]
    fn protocol_order() {
        let mut hw = backend();
        let _ = hw.compute_chunk(&[1.0; 4], &[1.0; 4], 4);
        let log = hw.registers().access_log();
        assert_eq!(log.len(), 2 * CHUNK_WIDTH + 1);
        // inputs, then weights, then exactly one read of the result
        for (i, access) in log[..CHUNK_WIDTH].iter().enumerate() {
            assert_eq!(access.offset(), INPUT_BASE + i * 4);
            assert!(access.is_write());
        }
        for (i, access) in log[CHUNK_WIDTH..2 * CHUNK_WIDTH].iter().enumerate() {
            assert_eq!(access.offset(), WEIGHT_BASE + i * 4);
            assert!(access.is_write());
        }
        assert!(matches!(log[2 * CHUNK_WIDTH], RegisterAccess::Read { offset: RESULT, .. }));
    }

    #[test]
    fn initialize_clears_blocks() {
        let mut hw = backend();
        hw.set_inputs(&[1.0, 2.0, 3.0, 4.0], 4);
        hw.set_weights(&[1.0, 2.0, 3.0, 4.0], 4);
        hw.initialize();
        assert_eq!(hw.registers().inputs(), [0; CHUNK_WIDTH]);
        assert_eq!(hw.registers().weights(), [0; CHUNK_WIDTH]);
        assert_eq!(hw.get_result(), 0);
    }

    #[test]
    fn negative_values_encode_twos_complement() {
        let mut hw = backend();
        hw.set_inputs(&[-1.0], 1);
        assert_eq!(hw.registers().inputs()[0], -65_536);
    }

    #[test]
    fn reports_type_from_construction() {
        assert_eq!(backend().backend_type(), BackendType::Simulated);
        let plain = HardwareBackend::new(SimulatedAccelerator::new());
        assert_eq!(plain.backend_type(), BackendType::Hardware);
    }

    #[test]
    fn default_simulator_keeps_no_history() {
        let mut hw = HardwareBackend::simulated(SimulatedAccelerator::new());
        for _ in 0..10_000 {
            let _ = hw.compute_chunk(&[0.5; 4], &[0.5; 4], 4);
        }
        assert!(hw.registers().access_log().is_empty());
    }

    #[test]
    fn simulated_keeps_custom_layout() {
        let map = RegisterMap { input: 0x40, weight: 0x00, result: 0x80 };
        let mut hw = HardwareBackend::simulated(SimulatedAccelerator::with_map(map));
        assert_eq!(hw.register_map(), &map);
        assert_eq!(hw.compute_chunk(&[2.0], &[3.0], 1), to_fixed(6.0, 16));
    }
}
