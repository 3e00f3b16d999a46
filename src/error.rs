// Announce Core - Audio clip library and announcement builder
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Error types for the audio library
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are grouped by the stage at which they are raised:
//!
//! ### Input validation (raised before any side effect)
//! - `InvalidPath`, `InvalidName` - malformed logical paths or names
//! - `InvalidCategory` - category outside the fixed vocabulary
//! - `ValidationError` - upload size/type/extension constraints
//! - `EmptyInput`, `InvalidOutputName` - concatenation request checks
//! - `RootGuard` - operations that would rename or delete the library root
//!
//! ### State conflicts
//! - `NotFound`, `UnknownFile` - referenced path absent on disk or in metadata
//! - `Conflict` - destination exists, or a folder would move into itself
//!
//! ### External tool
//! - `MergeFailed` - FFmpeg exited non-zero (carries captured stderr)
//! - `MergeToolNotFound` - FFmpeg binary missing
//! - `Timeout` - merge exceeded its configured time budget
//!
//! ### Storage / configuration
//! - `StorageError` - unexpected filesystem failure
//! - `ConfigurationError` - invalid library configuration

use thiserror::Error;

/// Result type alias using our LibraryError type
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Main error type for the audio library
#[derive(Error, Debug)]
pub enum LibraryError {
    // ===== Input Validation Errors =====

    /// Logical path is malformed (traversal, empty segment, reserved character)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// File or folder name is empty or unusable after sanitization
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Category is not part of the fixed vocabulary
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Upload rejected by size, media type or extension checks
    #[error("Upload rejected: {0}")]
    ValidationError(String),

    /// Concatenation requested with no input files
    #[error("No input files selected")]
    EmptyInput,

    /// Concatenation output name does not match the allowed pattern
    #[error("Invalid output file name: {0}")]
    InvalidOutputName(String),

    /// The library root can be neither renamed nor deleted
    #[error("Operation not permitted on the library root: {0}")]
    RootGuard(String),

    // ===== State Errors =====

    /// Referenced file or folder does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// File path has no entry in the metadata index
    #[error("Unknown file: {0}")]
    UnknownFile(String),

    /// Destination already exists, or a folder would be moved into itself
    #[error("Conflict: {0}")]
    Conflict(String),

    // ===== External Tool Errors =====

    /// FFmpeg exited with a non-zero status
    #[error("Audio merge failed: {diagnostics}")]
    MergeFailed {
        /// Captured stderr of the merge tool
        diagnostics: String,
        /// Exit code if the process exited normally
        exit_code: Option<i32>,
    },

    /// FFmpeg binary not found in PATH
    #[error("FFmpeg not found. Please install FFmpeg and ensure it's in your PATH.")]
    MergeToolNotFound,

    /// Operation timed out
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    // ===== Storage / Configuration Errors =====

    /// Unexpected filesystem failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Configuration is invalid or incomplete
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ===== External Library Errors =====

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<toml::de::Error> for LibraryError {
    fn from(err: toml::de::Error) -> Self {
        LibraryError::ConfigurationError(format!("Failed to parse configuration: {}", err))
    }
}

// Helper methods for creating common errors
impl LibraryError {
    /// Create an InvalidPath error with a message
    pub fn invalid_path<S: Into<String>>(message: S) -> Self {
        LibraryError::InvalidPath(message.into())
    }

    /// Create an InvalidName error with a message
    pub fn invalid_name<S: Into<String>>(message: S) -> Self {
        LibraryError::InvalidName(message.into())
    }

    /// Create a NotFound error with a resource name
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        LibraryError::NotFound(resource.into())
    }

    /// Create a Conflict error with a message
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        LibraryError::Conflict(message.into())
    }

    /// Create a StorageError with a message
    pub fn storage<S: Into<String>>(message: S) -> Self {
        LibraryError::StorageError(message.into())
    }

    /// Create a MergeFailed error
    pub fn merge_failed<S: Into<String>>(diagnostics: S, exit_code: Option<i32>) -> Self {
        LibraryError::MergeFailed {
            diagnostics: diagnostics.into(),
            exit_code,
        }
    }

    /// Map an I/O error raised while touching `target`
    ///
    /// A missing source becomes `NotFound`; everything else is a storage failure.
    pub fn from_io(action: &str, target: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            LibraryError::NotFound(target.to_string())
        } else {
            LibraryError::StorageError(format!("{} failed: {}: {}", action, target, err))
        }
    }

    /// Check if error was caused by client input
    ///
    /// Returns `true` for errors raised before any side effect took place.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LibraryError::InvalidPath(_)
                | LibraryError::InvalidName(_)
                | LibraryError::InvalidCategory(_)
                | LibraryError::ValidationError(_)
                | LibraryError::EmptyInput
                | LibraryError::InvalidOutputName(_)
                | LibraryError::RootGuard(_)
        )
    }

    /// Check if error is related to file/disk operations
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            LibraryError::StorageError(_)
                | LibraryError::IoError(_)
                | LibraryError::SerdeJsonError(_)
        )
    }

    /// Get user-friendly error message suitable for display
    ///
    /// Storage failures are reported generically; the detail is only logged.
    pub fn user_message(&self) -> String {
        match self {
            LibraryError::StorageError(_)
            | LibraryError::IoError(_)
            | LibraryError::SerdeJsonError(_) => {
                "The audio library could not complete the operation. Please try again.".to_string()
            }
            LibraryError::MergeToolNotFound => {
                "FFmpeg is required but not found. Please install FFmpeg and ensure it's in your PATH.".to_string()
            }
            LibraryError::MergeFailed { .. } => {
                "The selected files could not be concatenated. Make sure they share the same format.".to_string()
            }
            LibraryError::EmptyInput => "Select at least one file to concatenate.".to_string(),
            LibraryError::InvalidOutputName(_) => {
                "Output names may only contain letters, digits, spaces, '-' and '_' and must end in .mp3 or .wav.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_not_found() {
        let err = LibraryError::from_io(
            "rename",
            "Stations",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, LibraryError::NotFound(ref p) if p == "Stations"));

        let err = LibraryError::from_io(
            "rename",
            "Stations",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(err.is_storage_error());
    }

    #[test]
    fn test_user_message_hides_storage_detail() {
        let err = LibraryError::storage("write failed: /srv/audio/metadata.json: disk full");
        assert!(!err.user_message().contains("/srv/audio"));
        assert!(LibraryError::EmptyInput.is_client_error());
        assert!(!err.is_client_error());
    }
}
