// SPDX-License-Identifier: AGPL-3.0-only

//! Register-level model of the accelerator
//!
//! `SimulatedAccelerator` implements [`RegisterIo`] with an in-memory
//! register file and evaluates the combinational datapath whenever the result
//! register is read:
//!
//! ```text
//! result = low32( Σ_i (input_i × weight_i) >> 16 )      (signed, 64-bit products)
//! ```
//!
//! Products of two Q16.16 words are Q32.32; the shift renormalises them to
//! Q16.16 so the result word decodes with the same format as the elements.
//! Writes to the result register are dropped (it is a status register).
//!
//! [`SimulatedAccelerator::with_access_log`] records every access so tests can
//! check the register protocol. Recording is off by default.

use crate::fixed::{from_word, FRACTIONAL_BITS};
use crate::mmio::RegisterIo;
use dotacc_chip::format::CHUNK_WIDTH;
use dotacc_chip::regs::{RegisterMap, WORD_STRIDE};

/// One register access seen by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterAccess {
    /// Host store
    Write {
        /// Byte offset
        offset: usize,
        /// Stored word
        value: u32,
    },
    /// Host load
    Read {
        /// Byte offset
        offset: usize,
        /// Returned word
        value: u32,
    },
}

impl RegisterAccess {
    /// Byte offset of the access
    #[must_use]
    pub const fn offset(&self) -> usize {
        match self {
            Self::Write { offset, .. } | Self::Read { offset, .. } => *offset,
        }
    }

    /// Whether this access is a store
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}

/// In-process stand-in for the accelerator CSR block
#[derive(Debug, Clone)]
pub struct SimulatedAccelerator {
    map: RegisterMap,
    input: [u32; CHUNK_WIDTH],
    weight: [u32; CHUNK_WIDTH],
    log: Vec<RegisterAccess>,
    recording: bool,
}

impl SimulatedAccelerator {
    /// Simulator with the default register layout
    #[must_use]
    pub fn new() -> Self {
        Self::with_map(RegisterMap::DEFAULT)
    }

    /// Simulator answering at a custom register layout
    #[must_use]
    pub fn with_map(map: RegisterMap) -> Self {
        Self {
            map,
            input: [0; CHUNK_WIDTH],
            weight: [0; CHUNK_WIDTH],
            log: Vec::new(),
            recording: false,
        }
    }

    /// Record every register access from now on
    #[must_use]
    pub fn with_access_log(mut self) -> Self {
        self.recording = true;
        self
    }

    /// Register layout this simulator decodes
    #[must_use]
    pub const fn register_map(&self) -> &RegisterMap {
        &self.map
    }

    /// Current input block, as signed fixed-point words
    #[must_use]
    pub fn inputs(&self) -> [i32; CHUNK_WIDTH] {
        self.input.map(from_word)
    }

    /// Current weight block, as signed fixed-point words
    #[must_use]
    pub fn weights(&self) -> [i32; CHUNK_WIDTH] {
        self.weight.map(from_word)
    }

    /// Accesses recorded since construction or the last [`Self::clear_log`]
    ///
    /// Always empty unless built with [`Self::with_access_log`].
    #[must_use]
    pub fn access_log(&self) -> &[RegisterAccess] {
        &self.log
    }

    /// Forget recorded accesses
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Value the datapath currently drives onto the result register
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn combinational_result(&self) -> u32 {
        let sum: i64 = self
            .inputs()
            .iter()
            .zip(self.weights().iter())
            .map(|(&x, &w)| (i64::from(x) * i64::from(w)) >> FRACTIONAL_BITS)
            .sum();
        sum as u32
    }

    fn record(&mut self, access: RegisterAccess) {
        if self.recording {
            self.log.push(access);
        }
    }

    fn slot(base: usize, offset: usize) -> Option<usize> {
        let rel = offset.checked_sub(base)?;
        (rel % WORD_STRIDE == 0 && rel / WORD_STRIDE < CHUNK_WIDTH).then_some(rel / WORD_STRIDE)
    }
}

impl Default for SimulatedAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterIo for SimulatedAccelerator {
    fn write32(&mut self, offset: usize, value: u32) {
        self.record(RegisterAccess::Write { offset, value });
        if let Some(i) = Self::slot(self.map.input, offset) {
            self.input[i] = value;
        } else if let Some(i) = Self::slot(self.map.weight, offset) {
            self.weight[i] = value;
        } else {
            tracing::trace!("Dropped write to read-only/unmapped CSR {offset:#x}");
        }
    }

    fn read32(&mut self, offset: usize) -> u32 {
        let value = if offset == self.map.result {
            self.combinational_result()
        } else if let Some(i) = Self::slot(self.map.input, offset) {
            self.input[i]
        } else if let Some(i) = Self::slot(self.map.weight, offset) {
            self.weight[i]
        } else {
            0
        };
        self.record(RegisterAccess::Read { offset, value });
        value
    }
}
