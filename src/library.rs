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


//! Library facade
//!
//! [`AudioLibrary`] wires configuration, storage and the file operations
//! together and exposes the operation table used by the presentation
//! layer. Responses are serde types serialized in camelCase.
//!
//! # Usage Example
//! ```no_run
//! use announce_core::{AudioLibrary, LibraryConfig};
//!
//! # async fn example() -> announce_core::Result<()> {
//! let library = AudioLibrary::open(LibraryConfig::with_root("/srv/announce/audio")).await?;
//!
//! let folder = library.create_folder("/audio", "Stations").await?;
//! let listing = library.list().await;
//! println!("{} -> {} files", folder.path, listing.files.len());
//! # Ok(())
//! # }
//! ```

use crate::audio::concat::ConcatenationPipeline;
use crate::audio::merger::{FfmpegMerger, MediaMerger};
use crate::audio::upload::IncomingFile;
use crate::config::LibraryConfig;
use crate::error::Result;
use crate::file::manager::FileManager;
use crate::file::paths::{CanonicalPath, PathCodec};
use crate::file::scanner::{LibraryScanner, ScanResults};
use crate::file::tree::FileTreeEngine;
use crate::storage::category::CategoryIndex;
use crate::storage::metadata::MetadataStore;
use crate::storage::models::{AudioFile, Category, Folder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResponse {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameResponse {
    pub new_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcatResponse {
    pub output_path: String,
}

/// Full library listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    /// Newest first
    pub files: Vec<AudioFile>,
    /// Alphabetical
    pub folders: Vec<Folder>,
    pub categories: Vec<Category>,
}

// ============================================================================
// FACADE
// ============================================================================

pub struct AudioLibrary {
    config: LibraryConfig,
    codec: PathCodec,
    store: Arc<MetadataStore>,
    tree: FileTreeEngine,
    categories: CategoryIndex,
    pipeline: ConcatenationPipeline,
    scanner: LibraryScanner,
}

impl AudioLibrary {
    /// Open the library with the FFmpeg merger from the configuration
    pub async fn open(config: LibraryConfig) -> Result<Self> {
        let merger = Arc::new(FfmpegMerger::new(&config.merge));
        Self::with_merger(config, merger).await
    }

    /// Open the library with a custom merge capability
    pub async fn with_merger(config: LibraryConfig, merger: Arc<dyn MediaMerger>) -> Result<Self> {
        config.validate()?;

        let codec = PathCodec::new(&config.root_prefix);
        let files = FileManager::new(config.audio_root.clone());
        files.ensure_directory_exists(&config.audio_root).await?;

        let store = Arc::new(MetadataStore::new(config.metadata_path(), codec.clone()));
        let tree = FileTreeEngine::new(
            files.clone(),
            store.clone(),
            codec.clone(),
            config.upload.clone(),
            config.delete_missing_file,
        );
        let categories = CategoryIndex::new(store.clone(), codec.clone());
        let pipeline = ConcatenationPipeline::new(files, store.clone(), codec.clone(), merger);
        let scanner = LibraryScanner::new(config.audio_root.clone(), store.clone(), codec.clone());

        info!(audio_root = %config.audio_root.display(), "audio library opened");

        Ok(Self {
            config,
            codec,
            store,
            tree,
            categories,
            pipeline,
            scanner,
        })
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn codec(&self) -> &PathCodec {
        &self.codec
    }

    fn path_response(&self, path: &CanonicalPath) -> PathResponse {
        PathResponse {
            path: self.codec.view_path(path),
        }
    }

    /// List every file and folder. Never fails; an unreadable index lists empty.
    pub async fn list(&self) -> ListResponse {
        let index = self.store.snapshot().await;

        let mut files: Vec<AudioFile> = index
            .files
            .iter()
            .map(|(path, info)| AudioFile::from_entry(&self.codec, path, info))
            .collect();
        files.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.path.cmp(&b.path))
        });

        let mut folders: Vec<Folder> = index
            .folders
            .iter()
            .map(|(path, info)| Folder::from_entry(&self.codec, path, info))
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));

        ListResponse {
            files,
            folders,
            categories: Category::ALL.to_vec(),
        }
    }

    pub async fn create_folder(&self, parent: &str, name: &str) -> Result<PathResponse> {
        let path = self.tree.create_folder(parent, name).await?;
        Ok(self.path_response(&path))
    }

    pub async fn rename_folder(&self, old: &str, new_name: &str) -> Result<PathResponse> {
        let path = self.tree.rename_folder(old, new_name).await?;
        Ok(self.path_response(&path))
    }

    pub async fn delete_folder(&self, path: &str) -> Result<()> {
        self.tree.delete_folder(path).await
    }

    pub async fn move_folder(&self, source: &str, target_parent: &str) -> Result<PathResponse> {
        let path = self.tree.move_folder(source, target_parent).await?;
        Ok(self.path_response(&path))
    }

    pub async fn upload_file(
        &self,
        target_folder: &str,
        file: &IncomingFile,
        category: Option<Category>,
    ) -> Result<AudioFile> {
        self.tree.upload_file(target_folder, file, category).await
    }

    pub async fn rename_file(&self, path: &str, new_name: &str) -> Result<RenameResponse> {
        let new = self.tree.rename_file(path, new_name).await?;
        Ok(RenameResponse {
            new_path: self.codec.view_path(&new),
        })
    }

    pub async fn delete_file(&self, path: &str) -> Result<()> {
        self.tree.delete_file(path).await
    }

    pub async fn set_category(&self, file_path: &str, category: &str) -> Result<AudioFile> {
        self.categories.set_category(file_path, category).await
    }

    pub async fn concatenate(&self, inputs: &[String], output_name: &str) -> Result<ConcatResponse> {
        let file = self.pipeline.concatenate(inputs, output_name).await?;
        Ok(ConcatResponse {
            output_path: file.path,
        })
    }

    /// Reconcile the index with the audio root
    pub async fn scan(&self) -> Result<ScanResults> {
        self.scanner.reconcile().await
    }
}
