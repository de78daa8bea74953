// SPDX-License-Identifier: AGPL-3.0-only

//! Backend abstraction for the chunk computation
//!
//! One trait, two strategies: the hardware path drives the CSR block, the
//! software path computes the same chunk arithmetic on the CPU. The strategy
//! is chosen once, when the engine is built, never per call.

use crate::backends::{HardwareBackend, SoftwareBackend};
use crate::config::AccelConfig;
use crate::error::{AccelError, Result};
use crate::mmio::MappedRegion;
use crate::sim::SimulatedAccelerator;
use std::fmt::Debug;
use std::str::FromStr;

/// Chunk backend trait - computes one accelerator-sized slice of a dot product
pub trait ChunkBackend: Debug + Send {
    /// Bring the backend to a known state
    ///
    /// Clears every input and weight register on hardware; no-op in software.
    fn initialize(&mut self);

    /// Dot product of the first `chunk_size` element pairs, in Q16.16
    ///
    /// Never fails. Values outside the Q16.16 range wrap.
    fn compute_chunk(&mut self, inputs: &[f64], weights: &[f64], chunk_size: usize) -> i32;

    /// Get backend type for debugging
    fn backend_type(&self) -> BackendType;
}

/// Backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Memory-mapped accelerator
    Hardware,

    /// Register-level simulation of the accelerator
    Simulated,

    /// CPU fallback, no register I/O
    Software,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hardware => write!(f, "Hardware (MMIO)"),
            Self::Simulated => write!(f, "Simulated accelerator"),
            Self::Software => write!(f, "Software"),
        }
    }
}

/// Backend selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendSelection {
    /// Hardware when present and mappable, otherwise software
    #[default]
    Auto,

    /// Force the memory-mapped accelerator
    Hardware,

    /// Force the hardware path against the in-process simulator
    Simulated,

    /// Force the CPU fallback
    Software,
}

impl FromStr for BackendSelection {
    type Err = AccelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "hardware" | "hw" => Ok(Self::Hardware),
            "simulated" | "sim" => Ok(Self::Simulated),
            "software" | "sw" => Ok(Self::Software),
            other => Err(AccelError::invalid_config(format!(
                "unknown backend '{other}' (expected auto, hardware, simulated or software)"
            ))),
        }
    }
}

impl std::fmt::Display for BackendSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Hardware => "hardware",
            Self::Simulated => "simulated",
            Self::Software => "software",
        };
        f.write_str(name)
    }
}

/// Map the accelerator described by `config`
fn open_hardware(config: &AccelConfig) -> Result<HardwareBackend<MappedRegion>> {
    if !config.present {
        return Err(AccelError::AcceleratorAbsent);
    }
    let device = config
        .device
        .as_deref()
        .ok_or_else(|| AccelError::invalid_config("accelerator present but no device path set"))?;
    if !config.registers.is_disjoint() {
        return Err(AccelError::invalid_config(format!(
            "register blocks overlap: {:?}",
            config.registers
        )));
    }
    let region = MappedRegion::map(device, config.base_address, config.registers.span())?;
    Ok(HardwareBackend::with_map(region, config.registers))
}

/// Select appropriate backend based on configuration
///
/// # Errors
///
/// Returns error if `Hardware` is forced and the accelerator is absent or
/// cannot be mapped. `Auto` never fails: it falls back to software.
pub fn select_backend(config: &AccelConfig) -> Result<Box<dyn ChunkBackend>> {
    match config.selection {
        BackendSelection::Auto => match open_hardware(config) {
            Ok(backend) => {
                tracing::info!("Using hardware backend at {:#x}", config.base_address);
                Ok(Box::new(backend))
            }
            Err(AccelError::AcceleratorAbsent) => {
                tracing::info!("Accelerator not in this build, using software backend");
                Ok(Box::new(SoftwareBackend::new()))
            }
            Err(e) => {
                tracing::warn!("Accelerator unavailable ({e}), using software backend");
                Ok(Box::new(SoftwareBackend::new()))
            }
        },

        BackendSelection::Hardware => {
            open_hardware(config).map(|b| Box::new(b) as Box<dyn ChunkBackend>)
        }

        BackendSelection::Simulated => {
            let sim = SimulatedAccelerator::with_map(config.registers);
            Ok(Box::new(HardwareBackend::simulated(sim)))
        }

        BackendSelection::Software => Ok(Box::new(SoftwareBackend::new())),
    }
}
