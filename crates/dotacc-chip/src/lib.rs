// SPDX-License-Identifier: AGPL-3.0-only

//! Register model for the LiteX dot-product accelerator.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the accelerator as the gateware builds it: CSR block layout,
//! chunk width, and the fixed-point number format the datapath expects.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | CSR block offsets (input, weight, result) and the LiteX names they are exported under |
//! | [`format`] | Q16.16 fixed-point format and chunk width |
//!
//! # Datapath
//!
//! ```text
//!  input[0..4]  ──┐
//!                 ├─ 4 × (32×32 → 64) multipliers ─ pairwise adder tree ─ [31:0] ─ result
//!  weight[0..4] ──┘
//! ```
//!
//! The datapath is purely combinational: `result` reflects the most recent
//! writes to the input and weight blocks with no start strobe and no busy bit.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod format;
pub mod regs;
