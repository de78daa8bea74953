// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for accelerator setup
//!
//! Only the ambient operations fail: mapping the device, parsing
//! configuration and model files. The dot-product arithmetic itself is total.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, AccelError>;

/// Errors that can occur while bringing up the accelerator
#[derive(Debug, Error)]
pub enum AccelError {
    /// Device file not found at the expected path
    #[error("Device not found: {path}")]
    DeviceNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// Configuration says the accelerator is not part of this build
    #[error("Dot-product accelerator not present in this build")]
    AcceleratorAbsent,

    /// I/O error during device access
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Mapping the register block failed
    #[error("Failed to map register block: {reason}")]
    MapFailed {
        /// Reason for failure
        reason: String,
    },

    /// Configuration could not be parsed or is inconsistent
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for failure
        reason: String,
    },

    /// Classifier model could not be parsed or is inconsistent
    #[error("Invalid model: {reason}")]
    InvalidModel {
        /// Reason for failure
        reason: String,
    },
}

impl AccelError {
    /// Create a device not found error
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }

    /// Create a map failed error
    pub fn map_failed(reason: impl Into<String>) -> Self {
        Self::MapFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid model error
    pub fn invalid_model(reason: impl Into<String>) -> Self {
        Self::InvalidModel {
            reason: reason.into(),
        }
    }
}
