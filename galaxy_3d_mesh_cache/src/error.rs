//! Error types for the Galaxy3D mesh cache
//!
//! This module defines the error types used throughout the cache,
//! including handle validation, capacity exhaustion, and resource resolution.

use std::fmt;

/// Result type for mesh cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Mesh cache errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed descriptor or out-of-range argument
    InvalidParameter(String),

    /// Stale id/generation or out-of-range slot
    InvalidHandle(String),

    /// A fixed-capacity table is exhausted
    OutOfCapacity(String),

    /// Allocation failure in a collaborator
    OutOfMemory,

    /// The loader or a registry returned no usable payload
    ResourceCreationFailed(String),

    /// Requested name not present (recoverable, distinct from a hard failure)
    ResourceNotLoaded(String),

    /// Construction of the cache itself failed (configuration error)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Error::InvalidHandle(msg) => write!(f, "Invalid handle: {}", msg),
            Error::OutOfCapacity(msg) => write!(f, "Out of capacity: {}", msg),
            Error::OutOfMemory => write!(f, "Out of memory"),
            Error::ResourceCreationFailed(msg) => write!(f, "Resource creation failed: {}", msg),
            Error::ResourceNotLoaded(msg) => write!(f, "Resource not loaded: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Whether this error is the recoverable "name not present" signal
    pub fn is_not_loaded(&self) -> bool {
        matches!(self, Error::ResourceNotLoaded(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
