// SPDX-License-Identifier: AGPL-3.0-only

//! Q16.16 fixed-point codec
//!
//! Conversion between `f64` and the scaled integers the accelerator consumes.
//! Two widths exist: `i32` for elements and per-chunk results (the register
//! port width), `i64` for the host-side accumulator across chunks.
//!
//! ## Overflow
//!
//! There is no range check and no saturation. `to_fixed` truncates toward
//! zero and keeps the low 32 bits, so `|value| >= 2^15` wraps. Callers that
//! need the full range must scale their data beforehand.
//!
//! Non-finite inputs follow Rust's float-to-int cast: infinities clamp to the
//! `i64` range before truncation (and then wrap to 32 bits), NaN encodes to 0.

// Truncation and wrap are the documented encoding, not accidents
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub use dotacc_chip::format::FRACTIONAL_BITS;

/// `2^fractional_bits` as `f64`.
#[inline]
fn scale(fractional_bits: u32) -> f64 {
    (1u64 << fractional_bits) as f64
}

/// Encode `value` as a 32-bit fixed-point integer with `fractional_bits`.
///
/// Truncates toward zero; values outside the 32-bit range wrap.
#[inline]
#[must_use]
pub fn to_fixed(value: f64, fractional_bits: u32) -> i32 {
    (value * scale(fractional_bits)) as i64 as i32
}

/// Decode a 32-bit fixed-point integer.
#[inline]
#[must_use]
pub fn from_fixed(value: i32, fractional_bits: u32) -> f64 {
    f64::from(value) / scale(fractional_bits)
}

/// Decode the 64-bit accumulator.
#[inline]
#[must_use]
pub fn from_fixed64(value: i64, fractional_bits: u32) -> f64 {
    value as f64 / scale(fractional_bits)
}

/// Reinterpret an encoded element as the raw register word.
#[inline]
#[must_use]
pub const fn to_word(value: i32) -> u32 {
    value as u32
}

/// Reinterpret a raw register word as a signed fixed-point value.
#[inline]
#[must_use]
pub const fn from_word(word: u32) -> i32 {
    word as i32
}
