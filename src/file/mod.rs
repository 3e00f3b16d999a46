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


//! File management and path utilities
//!
//! This module maps logical library paths onto the audio root directory
//! and keeps folder/file mutations in step with the metadata index.
//!
//! # Module Organization
//! - `paths` - Canonical paths, name sanitization, output name rules
//! - `manager` - Filesystem primitives below the audio root
//! - `tree` - Folder and file operations with metadata cascades
//! - `scanner` - Filesystem walk that reconciles the index

pub mod manager;
pub mod paths;
pub mod scanner;
pub mod tree;

// Re-export commonly used types
pub use manager::FileManager;
pub use paths::{sanitize_name, validate_output_name, CanonicalPath, PathCodec};
pub use scanner::{LibraryScanner, ScanResults};
pub use tree::FileTreeEngine;
