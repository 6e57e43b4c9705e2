//! Error types
//!
//! The numeric pipeline itself never fails; every degenerate numeric case has
//! an explicit fallback. Errors only come from configuration, file I/O and
//! the generator session table.

use std::io;
use thiserror::Error;

/// Result type for RIS physics operations
pub type RisResult<T> = Result<T, RisError>;

#[derive(Error, Debug)]
pub enum RisError {
    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Channel matrices do not share the (N_ris x R) / (1 x R) layout
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Dataset or config file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Config file is not valid TOML for `SimulationConfig`
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// No free slot left in the generator table
    #[error("Generator table is full")]
    SlabFull,

    /// Handle does not refer to a live generator
    #[error("Unknown generator id {0}")]
    UnknownGenerator(u64),
}
