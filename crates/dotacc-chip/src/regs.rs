// SPDX-License-Identifier: AGPL-3.0-only

//! CSR block layout for the dot-product accelerator.
//!
//! LiteX exports the accelerator under the CSR name prefix `logistic`:
//!
//! ```text
//! csr_base,logistic,0xf0003000,,
//! csr_register,logistic_input,0xf0003000,4,rw
//! csr_register,logistic_weight,0xf0003010,4,rw
//! csr_register,logistic_result,0xf0003020,1,ro
//! ```
//!
//! Offsets below are relative to the block base. Each element occupies one
//! 32-bit word; element `i` of a block lives at `block + i * WORD_STRIDE`.
//! Writes are plain stores: no read-modify-write, no byte enables.

use crate::format::CHUNK_WIDTH;

// ── Naming ───────────────────────────────────────────────────────────────────

/// CSR name prefix the gateware registers the accelerator under.
pub const CSR_PREFIX: &str = "logistic";

/// LiteX register name of the input block.
pub const INPUT_NAME: &str = "logistic_input";

/// LiteX register name of the weight block.
pub const WEIGHT_NAME: &str = "logistic_weight";

/// LiteX register name of the result register.
pub const RESULT_NAME: &str = "logistic_result";

// ── Layout ───────────────────────────────────────────────────────────────────

/// Byte distance between consecutive element words.
pub const WORD_STRIDE: usize = 4;

/// Input block (CSRStorage, `CHUNK_WIDTH` words, write-only from the host).
pub const INPUT_BASE: usize = 0x00;

/// Weight block (CSRStorage, `CHUNK_WIDTH` words, write-only from the host).
pub const WEIGHT_BASE: usize = INPUT_BASE + CHUNK_WIDTH * WORD_STRIDE;

/// Result register (CSRStatus, one word, read-only).
pub const RESULT: usize = WEIGHT_BASE + CHUNK_WIDTH * WORD_STRIDE;

/// Bytes spanned by the whole block.
pub const BLOCK_SIZE: usize = RESULT + WORD_STRIDE;

/// Offsets of the three register groups relative to the CSR block base.
///
/// The default matches the gateware's field order. A LiteX build may place
/// the registers differently; the driver resolves those from `csr.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    /// Offset of input element 0.
    pub input: usize,
    /// Offset of weight element 0.
    pub weight: usize,
    /// Offset of the result register.
    pub result: usize,
}

impl RegisterMap {
    /// Layout used when no `csr.csv` is supplied.
    pub const DEFAULT: Self = Self {
        input: INPUT_BASE,
        weight: WEIGHT_BASE,
        result: RESULT,
    };

    /// Offset of input element `index`.
    #[must_use]
    pub const fn input_word(&self, index: usize) -> usize {
        self.input + index * WORD_STRIDE
    }

    /// Offset of weight element `index`.
    #[must_use]
    pub const fn weight_word(&self, index: usize) -> usize {
        self.weight + index * WORD_STRIDE
    }

    /// Number of bytes a mapping must cover to reach every register.
    #[must_use]
    pub fn span(&self) -> usize {
        let input_end = self.input_word(CHUNK_WIDTH);
        let weight_end = self.weight_word(CHUNK_WIDTH);
        let result_end = self.result + WORD_STRIDE;
        input_end.max(weight_end).max(result_end)
    }

    /// Whether the input block, weight block and result register are disjoint.
    #[must_use]
    pub fn is_disjoint(&self) -> bool {
        let block = CHUNK_WIDTH * WORD_STRIDE;
        let overlaps = |a: usize, a_len: usize, b: usize, b_len: usize| a < b + b_len && b < a + a_len;
        !overlaps(self.input, block, self.weight, block)
            && !overlaps(self.input, block, self.result, WORD_STRIDE)
            && !overlaps(self.weight, block, self.result, WORD_STRIDE)
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::DEFAULT
    }
}
