//! Error types for vdir
//!
//! Provides a unified error type for all container operations.

use thiserror::Error;

/// Result type alias using VdirError
pub type Result<T> = std::result::Result<T, VdirError>;

/// Unified error type for vdir operations
#[derive(Debug, Error)]
pub enum VdirError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    /// The session mode does not allow this operation
    #[error("{operation} not permitted by the session open mode")]
    PermissionDenied { operation: &'static str },

    #[error("Entry not found: {0}")]
    NotFound(String),

    /// The session was already closed
    #[error("{operation} on a closed container")]
    Closed { operation: &'static str },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Index corruption detected: {0}")]
    CorruptIndex(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("Entry of {size} bytes exceeds the record size limit")]
    EntryTooLarge { size: usize },

    #[error("Container full: placement would end at byte {required}")]
    ContainerFull { required: u64 },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VdirError {
    /// True for the "not permitted" sentinel
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, VdirError::PermissionDenied { .. })
    }

    /// True for the "not found" sentinel
    pub fn is_not_found(&self) -> bool {
        matches!(self, VdirError::NotFound(_))
    }

    /// True when the session had already been closed
    pub fn is_closed(&self) -> bool {
        matches!(self, VdirError::Closed { .. })
    }
}
