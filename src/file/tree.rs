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


//! Folder and file operations kept in lockstep with the metadata index
//!
//! Every operation follows the same shape:
//! 1. Normalize and validate all inputs (no side effects on failure)
//! 2. Open a metadata transaction
//! 3. Mutate the filesystem
//! 4. Mutate the index and commit once
//!
//! A filesystem failure in step 3 drops the transaction, so the index is
//! never updated for a mutation that did not happen. A crash between 3 and
//! 4 can still leave an on-disk entry without metadata; the scanner
//! reconciles those.

use crate::audio::format::AudioFormat;
use crate::audio::upload::{IncomingFile, UploadRules};
use crate::config::MissingFilePolicy;
use crate::error::{LibraryError, Result};
use crate::file::manager::FileManager;
use crate::file::paths::{child_of, sanitize_name, CanonicalPath, PathCodec};
use crate::storage::metadata::MetadataStore;
use crate::storage::models::{AudioFile, Category, FileInfo, FolderInfo};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Orchestrates folder and file mutations
pub struct FileTreeEngine {
    files: FileManager,
    store: Arc<MetadataStore>,
    codec: PathCodec,
    upload_rules: UploadRules,
    missing_file_policy: MissingFilePolicy,
}

impl FileTreeEngine {
    pub fn new(
        files: FileManager,
        store: Arc<MetadataStore>,
        codec: PathCodec,
        upload_rules: UploadRules,
        missing_file_policy: MissingFilePolicy,
    ) -> Self {
        Self {
            files,
            store,
            codec,
            upload_rules,
            missing_file_policy,
        }
    }

    // ========================================================================
    // FOLDERS
    // ========================================================================

    /// Create `name` below `parent`. Creating an existing folder succeeds.
    pub async fn create_folder(&self, parent: &str, name: &str) -> Result<CanonicalPath> {
        debug!(parent, name, "create folder");
        let result = self.create_folder_inner(parent, name).await;
        report("create folder", result)
    }

    async fn create_folder_inner(&self, parent: &str, name: &str) -> Result<CanonicalPath> {
        let parent = self.codec.normalize(parent)?;
        let name = sanitize_name(name)?;
        let path = child_of(&parent, &name)?;

        if self.files.exists(&path).await && !self.files.is_directory(&path).await {
            return Err(LibraryError::conflict(format!("a file named {} exists", path)));
        }

        let mut txn = self.store.begin().await;
        self.files.create_folder(&path).await?;

        let now = Utc::now();
        let index = txn.index_mut();
        index.ensure_ancestors(&path, now);
        index
            .folders
            .entry(path.clone())
            .or_insert(FolderInfo { name, created_at: now });
        txn.commit().await?;

        info!(path = %path, "folder created");
        Ok(path)
    }

    /// Rename a folder in place, carrying every descendant along
    pub async fn rename_folder(&self, old: &str, new_name: &str) -> Result<CanonicalPath> {
        debug!(old, new_name, "rename folder");
        let result = self.rename_folder_inner(old, new_name).await;
        report("rename folder", result)
    }

    async fn rename_folder_inner(&self, old: &str, new_name: &str) -> Result<CanonicalPath> {
        let old = self.codec.normalize(old)?;
        if old.is_root() {
            return Err(LibraryError::RootGuard("rename".to_string()));
        }
        let name = sanitize_name(new_name)?;
        let parent = old.parent().unwrap_or_else(CanonicalPath::root);
        let new = child_of(&parent, &name)?;

        if !self.files.is_directory(&old).await {
            return Err(LibraryError::not_found(old.to_string()));
        }
        if new == old {
            return Ok(new);
        }

        self.relocate_folder(&old, &new).await?;
        info!(old = %old, new = %new, "folder renamed");
        Ok(new)
    }

    /// Delete a folder and everything below it
    ///
    /// A missing folder is not an error; its metadata is still purged.
    pub async fn delete_folder(&self, path: &str) -> Result<()> {
        debug!(path, "delete folder");
        let result = self.delete_folder_inner(path).await;
        report("delete folder", result)
    }

    async fn delete_folder_inner(&self, path: &str) -> Result<()> {
        let path = self.codec.normalize(path)?;
        if path.is_root() {
            return Err(LibraryError::RootGuard("delete".to_string()));
        }
        if self.files.exists(&path).await && !self.files.is_directory(&path).await {
            return Err(LibraryError::invalid_path(format!("{} is not a folder", path)));
        }

        let mut txn = self.store.begin().await;
        let existed = self.files.remove_folder(&path).await?;
        let removed = txn.index_mut().remove_subtree(&path);
        txn.commit().await?;

        info!(path = %path, existed, entries_removed = removed, "folder deleted");
        Ok(())
    }

    /// Move a folder below another folder, keeping its name
    pub async fn move_folder(&self, source: &str, target_parent: &str) -> Result<CanonicalPath> {
        debug!(source, target_parent, "move folder");
        let result = self.move_folder_inner(source, target_parent).await;
        report("move folder", result)
    }

    async fn move_folder_inner(&self, source: &str, target_parent: &str) -> Result<CanonicalPath> {
        let source = self.codec.normalize(source)?;
        let target = self.codec.normalize(target_parent)?;
        if source.is_root() {
            return Err(LibraryError::RootGuard("move".to_string()));
        }
        if target.is_same_or_descendant_of(&source) {
            return Err(LibraryError::conflict(format!(
                "cannot move {} into itself",
                source
            )));
        }

        let name = source.name().unwrap_or_default().to_string();
        let new = child_of(&target, &name)?;

        if !self.files.is_directory(&source).await {
            return Err(LibraryError::not_found(source.to_string()));
        }
        if new == source {
            return Ok(new);
        }
        if !target.is_root() && !self.files.is_directory(&target).await {
            return Err(LibraryError::not_found(target.to_string()));
        }

        self.relocate_folder(&source, &new).await?;
        info!(source = %source, new = %new, "folder moved");
        Ok(new)
    }

    /// Shared rename/move: one filesystem rename plus one subtree rebase
    async fn relocate_folder(&self, old: &CanonicalPath, new: &CanonicalPath) -> Result<()> {
        let mut txn = self.store.begin().await;
        self.files.rename(old, new).await?;

        let now = Utc::now();
        let index = txn.index_mut();
        let rewritten = index.rebase_subtree(old, new);
        index.ensure_ancestors(new, now);
        index.folders.entry(new.clone()).or_insert_with(|| FolderInfo {
            name: new.name().unwrap_or_default().to_string(),
            created_at: now,
        });
        txn.commit().await?;

        debug!(entries = rewritten, "subtree rebased");
        Ok(())
    }

    // ========================================================================
    // FILES
    // ========================================================================

    /// Store an uploaded clip in `target_folder`
    ///
    /// Limits are checked before anything else, so a rejected upload leaves
    /// no trace. The folder is created if missing. An existing file of the
    /// same name is replaced; it keeps its category unless one is given.
    pub async fn upload_file(
        &self,
        target_folder: &str,
        file: &IncomingFile,
        category: Option<Category>,
    ) -> Result<AudioFile> {
        debug!(target_folder, file = %file.file_name, size = file.size(), "upload file");
        let result = self.upload_file_inner(target_folder, file, category).await;
        report("upload file", result)
    }

    async fn upload_file_inner(
        &self,
        target_folder: &str,
        file: &IncomingFile,
        category: Option<Category>,
    ) -> Result<AudioFile> {
        self.upload_rules.validate(file)?;

        let folder = self.codec.normalize(target_folder)?;
        let name = sanitize_name(&file.file_name)?;
        if AudioFormat::from_name(&name).is_none() {
            return Err(LibraryError::ValidationError(format!(
                "'{}' has no audio extension once sanitized",
                file.file_name
            )));
        }
        let path = child_of(&folder, &name)?;

        if self.files.is_directory(&path).await {
            return Err(LibraryError::conflict(format!("a folder named {} exists", path)));
        }

        let mut txn = self.store.begin().await;
        self.files.create_folder(&folder).await?;
        self.files.write_file(&path, &file.bytes).await?;

        let now = Utc::now();
        let index = txn.index_mut();
        index.ensure_ancestors(&path, now);
        let category = category.or_else(|| index.files.get(&path).and_then(|f| f.category));
        let info = FileInfo {
            name,
            category,
            created_at: now,
        };
        let view = AudioFile::from_entry(&self.codec, &path, &info);
        index.files.insert(path.clone(), info);
        txn.commit().await?;

        info!(path = %path, bytes = file.size(), "file uploaded");
        Ok(view)
    }

    /// Rename a file within its folder
    ///
    /// A clip keeps its format: renaming `intro.mp3` to `welcome` or to
    /// `welcome.wav` both yield `welcome.mp3`.
    pub async fn rename_file(&self, old: &str, new_name: &str) -> Result<CanonicalPath> {
        debug!(old, new_name, "rename file");
        let result = self.rename_file_inner(old, new_name).await;
        report("rename file", result)
    }

    async fn rename_file_inner(&self, old: &str, new_name: &str) -> Result<CanonicalPath> {
        let old = self.codec.normalize(old)?;
        let mut name = sanitize_name(new_name)?;
        if let Some(format) = old.name().and_then(AudioFormat::from_name) {
            name = with_format(&name, format);
        }
        let parent = old.parent().unwrap_or_else(CanonicalPath::root);
        let new = child_of(&parent, &name)?;

        if old.is_root() || self.files.is_directory(&old).await {
            return Err(LibraryError::invalid_path(format!("{} is not a file", old)));
        }
        if !self.files.exists(&old).await {
            return Err(LibraryError::not_found(old.to_string()));
        }
        if new == old {
            return Ok(new);
        }

        let mut txn = self.store.begin().await;
        self.files.rename(&old, &new).await?;

        let now = Utc::now();
        let index = txn.index_mut();
        let info = match index.files.remove(&old) {
            Some(info) => FileInfo { name, ..info },
            None => FileInfo {
                name,
                category: None,
                created_at: now,
            },
        };
        index.ensure_ancestors(&new, now);
        index.files.insert(new.clone(), info);
        txn.commit().await?;

        info!(old = %old, new = %new, "file renamed");
        Ok(new)
    }

    /// Delete a file and its metadata entry
    ///
    /// The entry is removed even when the file is already gone; whether
    /// that case is reported as `NotFound` follows the missing-file policy.
    pub async fn delete_file(&self, path: &str) -> Result<()> {
        debug!(path, "delete file");
        let result = self.delete_file_inner(path).await;
        report("delete file", result)
    }

    async fn delete_file_inner(&self, path: &str) -> Result<()> {
        let path = self.codec.normalize(path)?;
        if path.is_root() || self.files.is_directory(&path).await {
            return Err(LibraryError::invalid_path(format!("{} is not a file", path)));
        }

        let mut txn = self.store.begin().await;
        let existed = self.files.remove_file(&path).await?;
        let had_entry = txn.index_mut().files.remove(&path).is_some();
        if existed || had_entry {
            txn.commit().await?;
        }

        if !existed && self.missing_file_policy == MissingFilePolicy::Fail {
            return Err(LibraryError::not_found(path.to_string()));
        }

        info!(path = %path, existed, "file deleted");
        Ok(())
    }
}

/// Log the outcome of an operation before handing it back
///
/// Storage failures are logged with full detail here; callers only show
/// `LibraryError::user_message()`.
fn report<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if e.is_storage_error() {
            error!(operation, error = %e, "operation failed");
        } else {
            debug!(operation, error = %e, "operation rejected");
        }
    }
    result
}

/// `name` carrying the extension of `format`, replacing any other audio extension
fn with_format(name: &str, format: AudioFormat) -> String {
    match AudioFormat::from_name(name) {
        Some(given) if given == format => name.to_string(),
        Some(_) => {
            let stem = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);
            format!("{}.{}", stem, format.to_extension())
        }
        None => format!("{}.{}", name, format.to_extension()),
    }
}
