//! Error types for the Ember3D resource core
//!
//! This module defines the error types used throughout the engine:
//! I/O failures while locating asset files, malformed asset content,
//! registry misuse and graphics backend failures.
//!
//! Contract violations (releasing an asset the registry does not own,
//! out-of-range enumeration) are not represented here: they panic.

use std::fmt;

/// Result type for Ember3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ember3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Asset file could not be located by the resource loader
    NotFound(String),

    /// Asset file exists but could not be read (permission denied, truncated read, ...)
    Io(String),

    /// Asset content was rejected by its importer (bad scene, malformed markup, ...)
    MalformedResource(String),

    /// Invalid resource request (kind mismatch, name collision, missing material, ...)
    InvalidResource(String),

    /// Backend-specific error (graphics device, scene import backend)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Initialization failed (engine, resource manager, resource loader)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
            Error::MalformedResource(msg) => write!(f, "Malformed resource: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
