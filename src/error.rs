//! Error types for Atelier operations.
//!
//! This module defines [`AtelierError`], the primary error type used
//! throughout the backend, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `AtelierError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `AtelierError::Other`) for unexpected errors
//! - The public API (`Suite`) converts every error into an `InstallResult`
//!   message; nothing below it should panic on external-world failures

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Atelier operations.
#[derive(Debug, Error)]
pub enum AtelierError {
    /// Installs are only supported on Linux hosts.
    #[error("Unsupported operating system")]
    UnsupportedPlatform,

    /// The target executable could not be located or spawned.
    #[error("Failed to invoke '{program}': {message}")]
    ProcessInvocation { program: String, message: String },

    /// A command ran but exited nonzero. Carried as data by most callers;
    /// only the orchestrator promotes it to a failure.
    #[error("Command '{command}' exited with code {code:?}: {output}")]
    CommandExited {
        command: String,
        code: Option<i32>,
        output: String,
    },

    /// Network or I/O failure while downloading an archive.
    #[error("Download of {url} failed: {message}")]
    TransferFailed { url: String, message: String },

    /// Archive could not be unpacked.
    #[error("Failed to extract {path}: {message}")]
    ExtractionFailed { path: PathBuf, message: String },

    /// A copy job in the placement batch failed.
    #[error("Failed to place {item}: {message}")]
    PlacementFailed { item: PathBuf, message: String },

    /// Requested program is not in the catalog.
    #[error("Unknown program: {name}")]
    UnknownProgram { name: String },

    /// Requested variant does not exist for the program.
    #[error("Unknown variant '{variant}' for {program}")]
    UnknownVariant { program: String, variant: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Atelier operations.
pub type Result<T> = std::result::Result<T, AtelierError>;
