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


//! Filesystem operations below the audio root
//!
//! # Key Operations
//! - Directory creation (recursive, idempotent)
//! - Renames that refuse to overwrite an existing destination
//! - Recursive and single-file deletes that tolerate a missing target
//! - Atomic writes (temp file, fsync, rename)
//! - Best-effort deletes with retry for temporary artifacts
//!
//! All library-facing methods take a [`CanonicalPath`] and resolve it below
//! the root, so error messages name the logical path rather than the
//! on-disk location.

use crate::error::{LibraryError, Result};
use crate::file::paths::CanonicalPath;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;

/// Maximum retry attempts for file operations
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Delay between retry attempts
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// File manager rooted at the audio library directory
#[derive(Debug, Clone)]
pub struct FileManager {
    /// Base library directory
    library_path: PathBuf,
}

impl FileManager {
    /// Create a new file manager
    pub fn new(library_path: PathBuf) -> Self {
        Self { library_path }
    }

    /// Get the library path
    pub fn library_path(&self) -> &Path {
        &self.library_path
    }

    /// On-disk location of a logical path
    pub fn resolve(&self, path: &CanonicalPath) -> PathBuf {
        path.to_fs_path(&self.library_path)
    }

    /// Whether anything exists at `path`
    pub async fn exists(&self, path: &CanonicalPath) -> bool {
        Self::file_exists(&self.resolve(path)).await
    }

    /// Whether `path` is an existing directory
    pub async fn is_directory(&self, path: &CanonicalPath) -> bool {
        fs::metadata(self.resolve(path))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create a folder and any missing parents. Existing folders are fine.
    pub async fn create_folder(&self, path: &CanonicalPath) -> Result<()> {
        fs::create_dir_all(self.resolve(path))
            .await
            .map_err(|e| LibraryError::from_io("create folder", path.as_str(), e))
    }

    /// Rename a file or folder without overwriting the destination
    ///
    /// Renaming a directory carries its whole subtree along.
    pub async fn rename(&self, from: &CanonicalPath, to: &CanonicalPath) -> Result<()> {
        let source = self.resolve(from);
        let destination = self.resolve(to);

        if !Self::file_exists(&source).await {
            return Err(LibraryError::not_found(from.to_string()));
        }
        if Self::file_exists(&destination).await {
            return Err(LibraryError::conflict(format!("{} already exists", to)));
        }

        fs::rename(&source, &destination).await.map_err(|e| {
            LibraryError::from_io("rename", &format!("{} -> {}", from, to), e)
        })
    }

    /// Recursively delete a folder. Returns whether it existed.
    pub async fn remove_folder(&self, path: &CanonicalPath) -> Result<bool> {
        match fs::remove_dir_all(self.resolve(path)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LibraryError::from_io("delete folder", path.as_str(), e)),
        }
    }

    /// Delete a single file. Returns whether it existed.
    pub async fn remove_file(&self, path: &CanonicalPath) -> Result<bool> {
        match fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LibraryError::from_io("delete file", path.as_str(), e)),
        }
    }

    /// Write file contents, creating the parent folder if needed
    pub async fn write_file(&self, path: &CanonicalPath, contents: &[u8]) -> Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            self.ensure_directory_exists(parent).await?;
        }
        fs::write(&target, contents)
            .await
            .map_err(|e| LibraryError::from_io("write", path.as_str(), e))
    }

    /// Safe delete operation with retry
    ///
    /// Used for temporary artifacts; a missing file is not an error.
    pub async fn safe_delete(&self, path: &Path) -> Result<()> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match Self::safe_delete_once(path).await {
                Ok(()) => return Ok(()),
                Err(e) if attempts >= MAX_RETRY_ATTEMPTS => {
                    return Err(LibraryError::storage(format!(
                        "Failed to delete file after {} attempts: {}: {}",
                        MAX_RETRY_ATTEMPTS,
                        path.display(),
                        e
                    )));
                }
                Err(_) => {
                    sleep(RETRY_DELAY).await;
                    continue;
                }
            }
        }
    }

    /// Try to delete file once
    async fn safe_delete_once(path: &Path) -> Result<()> {
        // Not an error if file doesn't exist
        if !Self::file_exists(path).await {
            return Ok(());
        }

        fs::remove_file(path).await.map_err(|e| {
            LibraryError::storage(format!("Delete failed: {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Ensure directory exists, creating parent directories as needed
    pub async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if Self::file_exists(path).await {
            return Ok(());
        }

        fs::create_dir_all(path).await.map_err(|e| {
            LibraryError::storage(format!(
                "Failed to create directory {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Check if file exists
    pub async fn file_exists(path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    /// Atomic write: write to temp file, then rename
    pub async fn atomic_write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("file");
        let temp_path = match path.parent() {
            Some(parent) => parent.join(format!(".{}.tmp", file_name)),
            None => PathBuf::from(format!(".{}.tmp", file_name)),
        };

        // Write to temp file
        fs::write(&temp_path, contents).await.map_err(|e| {
            LibraryError::storage(format!(
                "Failed to write temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        // Sync to disk
        let file = fs::OpenOptions::new()
            .write(true)
            .open(&temp_path)
            .await
            .map_err(|e| {
                LibraryError::storage(format!(
                    "Failed to open temp file for sync {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

        file.sync_all().await.map_err(|e| {
            LibraryError::storage(format!(
                "Failed to sync temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        drop(file);

        fs::rename(&temp_path, path).await.map_err(|e| {
            LibraryError::storage(format!(
                "Failed to rename temp file {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        Ok(())
    }
}
