//! Error types for the Cornstand service.

use thiserror::Error;

use crate::store::StoreError;

/// Main error type for Cornstand operations.
#[derive(Error, Debug)]
pub enum CornstandError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller input rejected before any store access
    #[error("Validation error: {0}")]
    Validation(String),

    /// The key-value store failed or timed out; the outcome is indeterminate
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CornstandError {
    /// Whether this error was caused by caller input rather than the service.
    pub fn is_validation(&self) -> bool {
        matches!(self, CornstandError::Validation(_))
    }
}

/// Result type alias for Cornstand operations.
pub type Result<T> = std::result::Result<T, CornstandError>;
