// SPDX-License-Identifier: AGPL-3.0-only

//! Accelerator configuration
//!
//! Where the accelerator lives and whether it exists at all. Sources, lowest
//! priority first:
//!
//! 1. Built-in defaults (no accelerator, default register layout)
//! 2. `DOTACC_DEVICE` / `DOTACC_BASE` / `DOTACC_BACKEND` environment variables
//! 3. A LiteX `csr.csv` (`DOTACC_CSR_CSV`), which decides presence: a build
//!    without the `logistic` CSR block has no accelerator, whatever the
//!    device path says
//!
//! The configuration is consumed once, when the engine is constructed.

use crate::backend::BackendSelection;
use crate::error::{AccelError, Result};
use dotacc_chip::format::CHUNK_WIDTH;
use dotacc_chip::regs::{RegisterMap, CSR_PREFIX, INPUT_NAME, RESULT_NAME, WEIGHT_NAME};
use std::path::{Path, PathBuf};

/// Backend selection (`auto`, `hardware`, `simulated`, `software`)
pub const ENV_BACKEND: &str = "DOTACC_BACKEND";
/// Device file to map (`/dev/mem`, `/dev/uioN`, PCIe `resourceN`)
pub const ENV_DEVICE: &str = "DOTACC_DEVICE";
/// Byte offset of the CSR block inside the device file
pub const ENV_BASE: &str = "DOTACC_BASE";
/// Path to the LiteX `csr.csv` of the running gateware
pub const ENV_CSR_CSV: &str = "DOTACC_CSR_CSV";

/// Accelerator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccelConfig {
    /// Backend selection strategy
    pub selection: BackendSelection,
    /// Device file holding the CSR block
    pub device: Option<PathBuf>,
    /// Offset of the CSR block inside `device`
    pub base_address: u64,
    /// Register offsets relative to `base_address`
    pub registers: RegisterMap,
    /// Whether the gateware contains the accelerator
    pub present: bool,
    /// Presence reported by a loaded `csr.csv`; overrides the device path
    pub csr_present: Option<bool>,
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            selection: BackendSelection::Auto,
            device: None,
            base_address: 0,
            registers: RegisterMap::DEFAULT,
            present: false,
            csr_present: None,
        }
    }
}

impl AccelConfig {
    /// Configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but malformed, or the `csr.csv` it
    /// names cannot be read or parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Configuration from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(device) = lookup(ENV_DEVICE).filter(|s| !s.is_empty()) {
            config = config.with_device(device);
        }
        if let Some(base) = lookup(ENV_BASE).filter(|s| !s.is_empty()) {
            config = config.with_base_address(parse_address(&base)?);
        }
        if let Some(csv) = lookup(ENV_CSR_CSV).filter(|s| !s.is_empty()) {
            config = config.with_csr_map(&CsrMap::load(Path::new(&csv))?);
        }
        if let Some(selection) = lookup(ENV_BACKEND).filter(|s| !s.is_empty()) {
            config = config.with_selection(selection.parse()?);
        }

        tracing::debug!("Resolved accelerator config: {config:?}");
        Ok(config)
    }

    /// Set the backend selection strategy
    #[must_use]
    pub fn with_selection(mut self, selection: BackendSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Set the device file and mark the accelerator present
    ///
    /// A previously applied `csr.csv` still decides presence.
    #[must_use]
    pub fn with_device(mut self, device: impl Into<PathBuf>) -> Self {
        self.device = Some(device.into());
        self.present = self.csr_present.unwrap_or(true);
        self
    }

    /// Set the CSR block offset inside the device file
    #[must_use]
    pub fn with_base_address(mut self, base: u64) -> Self {
        self.base_address = base;
        self
    }

    /// Set the register layout
    #[must_use]
    pub fn with_register_map(mut self, registers: RegisterMap) -> Self {
        self.registers = registers;
        self
    }

    /// Apply presence, base and layout from a parsed `csr.csv`
    #[must_use]
    pub fn with_csr_map(mut self, map: &CsrMap) -> Self {
        self.present = map.present;
        self.csr_present = Some(map.present);
        if map.present {
            self.base_address = map.base;
            self.registers = map.registers;
        }
        self
    }
}

/// Parse `0x`-prefixed hex or decimal
///
/// # Errors
///
/// Returns error if `text` is not a valid address.
pub fn parse_address(text: &str) -> Result<u64> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => text.replace('_', "").parse(),
    };
    parsed.map_err(|e| AccelError::invalid_config(format!("bad address '{text}': {e}")))
}

/// Accelerator entry of a LiteX `csr.csv`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsrMap {
    /// Whether the gateware exports the accelerator CSR block
    pub present: bool,
    /// Absolute address of the CSR block
    pub base: u64,
    /// Register offsets relative to `base`
    pub registers: RegisterMap,
}

impl CsrMap {
    /// Read and parse a `csr.csv` file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or fails [`Self::parse`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AccelError::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    /// Parse the text of a `csr.csv`
    ///
    /// Rows other than `csr_base` and `csr_register` are ignored, as are
    /// registers of other cores.
    ///
    /// # Errors
    ///
    /// Returns error if the accelerator block is declared but one of its
    /// registers is missing, too small, below the base, or overlapping.
    pub fn parse(text: &str) -> Result<Self> {
        let mut base = None;
        let mut input = None;
        let mut weight = None;
        let mut result = None;

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            match (fields.first().copied(), fields.get(1).copied()) {
                (Some("csr_base"), Some(name)) if name == CSR_PREFIX => {
                    base = Some(parse_field(&fields, 2, lineno)?);
                }
                (Some("csr_register"), Some(name)) => {
                    let slot = match name {
                        n if n == INPUT_NAME => &mut input,
                        n if n == WEIGHT_NAME => &mut weight,
                        n if n == RESULT_NAME => &mut result,
                        _ => continue,
                    };
                    let addr = parse_field(&fields, 2, lineno)?;
                    let words = parse_field(&fields, 3, lineno)?;
                    *slot = Some((addr, words));
                }
                _ => {}
            }
        }

        let Some(base) = base else {
            tracing::debug!("csr.csv has no '{CSR_PREFIX}' block: accelerator absent");
            return Ok(Self {
                present: false,
                base: 0,
                registers: RegisterMap::DEFAULT,
            });
        };

        let offset = |name: &str, entry: Option<(u64, u64)>, min_words: usize| -> Result<usize> {
            let (addr, words) = entry
                .ok_or_else(|| AccelError::invalid_config(format!("csr.csv lacks {name}")))?;
            if usize::try_from(words).map_or(false, |w| w < min_words) {
                return Err(AccelError::invalid_config(format!(
                    "{name} spans {words} words, need {min_words}"
                )));
            }
            addr.checked_sub(base)
                .and_then(|off| usize::try_from(off).ok())
                .ok_or_else(|| {
                    AccelError::invalid_config(format!(
                        "{name} at {addr:#x} lies below block base {base:#x}"
                    ))
                })
        };

        let registers = RegisterMap {
            input: offset(INPUT_NAME, input, CHUNK_WIDTH)?,
            weight: offset(WEIGHT_NAME, weight, CHUNK_WIDTH)?,
            result: offset(RESULT_NAME, result, 1)?,
        };
        if !registers.is_disjoint() {
            return Err(AccelError::invalid_config(format!(
                "accelerator registers overlap: {registers:?}"
            )));
        }

        tracing::debug!("csr.csv: accelerator at {base:#x}, {registers:?}");
        Ok(Self {
            present: true,
            base,
            registers,
        })
    }
}

fn parse_field(fields: &[&str], index: usize, lineno: usize) -> Result<u64> {
    let field = fields.get(index).ok_or_else(|| {
        AccelError::invalid_config(format!("csr.csv line {}: missing column {index}", lineno + 1))
    })?;
    parse_address(field)
        .map_err(|e| AccelError::invalid_config(format!("csr.csv line {}: {e}", lineno + 1)))
}
