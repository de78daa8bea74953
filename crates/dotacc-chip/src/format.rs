// SPDX-License-Identifier: AGPL-3.0-only

//! Fixed-point format and chunk geometry.
//!
//! Every element written to the accelerator is a signed Q16.16 word. The
//! result register is 32 bits wide, so a chunk's dot product must fit in
//! Q16.16 as well; cross-chunk accumulation happens on the host in 64 bits.

/// Number of fractional bits in every element and result word.
pub const FRACTIONAL_BITS: u32 = 16;

/// Scale factor `2^FRACTIONAL_BITS`.
pub const SCALE: i64 = 1 << FRACTIONAL_BITS;

/// Elements processed per accelerator operation (multipliers in the datapath).
pub const CHUNK_WIDTH: usize = 4;

/// Width of one element / result word in bits.
pub const WORD_BITS: u32 = 32;

/// Smallest step representable in Q16.16.
pub const RESOLUTION: f64 = 1.0 / SCALE as f64;

/// Largest magnitude that encodes without wrapping (`2^15`, exclusive).
pub const MAX_MAGNITUDE: f64 = (1u64 << (WORD_BITS - 1 - FRACTIONAL_BITS)) as f64;
