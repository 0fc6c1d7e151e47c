//! Error types for geometry-kernel operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur inside a geometry kernel.
#[derive(Error, Debug)]
pub enum KernelError {
    /// A primitive parameter is out of range (negative radius, NaN size).
    #[error("Invalid parameter {name} = {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// I/O error reading an interchange file.
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The kernel rejected an interchange file.
    #[error("Import of '{path}' failed: {reason}")]
    Import {
        /// The rejected file.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// A transform contains NaN or infinite entries.
    #[error("Transform contains non-finite entries")]
    NonFiniteTransform,
}

impl KernelError {
    /// Create an import error.
    pub fn import(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Import {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
