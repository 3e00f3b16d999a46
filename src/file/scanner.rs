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


//! Library scanner for syncing the filesystem with the metadata index
//!
//! The filesystem decides what exists; the index only adds category and
//! creation time. Scanning walks the audio root and repairs the index in
//! both directions.

use crate::audio::format::AudioFormat;
use crate::error::{LibraryError, Result};
use crate::file::paths::{CanonicalPath, PathCodec};
use crate::storage::metadata::MetadataStore;
use crate::storage::models::{FileInfo, FolderInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Scan results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResults {
    /// Number of folders found on disk
    pub folders_found: usize,
    /// Number of audio files found on disk
    pub files_found: usize,
    /// Index entries created for on-disk entries without metadata
    pub entries_added: usize,
    /// Index entries dropped because nothing exists on disk
    pub entries_removed: usize,
}

/// What the walk saw on disk
#[derive(Default)]
struct DiskTree {
    folders: BTreeMap<CanonicalPath, DateTime<Utc>>,
    files: BTreeMap<CanonicalPath, DateTime<Utc>>,
}

/// Library scanner
pub struct LibraryScanner {
    root: PathBuf,
    store: Arc<MetadataStore>,
    codec: PathCodec,
}

impl LibraryScanner {
    pub fn new(root: PathBuf, store: Arc<MetadataStore>, codec: PathCodec) -> Self {
        Self { root, store, codec }
    }

    /// Scan the audio root and reconcile the index
    ///
    /// 1. Recursively collect folders and mp3/wav files, skipping hidden
    ///    entries (temporary lists and write buffers) and the index itself
    /// 2. Register on-disk entries that have no metadata
    /// 3. Drop metadata entries whose file or folder is gone
    ///
    /// Returns scan statistics
    pub async fn reconcile(&self) -> Result<ScanResults> {
        if !fs::metadata(&self.root).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(LibraryError::InvalidPath(format!(
                "Directory does not exist: {}",
                self.root.display()
            )));
        }

        let mut txn = self.store.begin().await;

        let mut disk = DiskTree::default();
        self.scan_recursive(&self.root, &mut disk).await?;

        let mut results = ScanResults {
            folders_found: disk.folders.len(),
            files_found: disk.files.len(),
            ..Default::default()
        };

        let index = txn.index_mut();

        let before = index.folders.len() + index.files.len();
        index.folders.retain(|path, _| disk.folders.contains_key(path));
        index.files.retain(|path, _| disk.files.contains_key(path));
        results.entries_removed = before - (index.folders.len() + index.files.len());

        for (path, created_at) in disk.folders {
            if !index.folders.contains_key(&path) {
                let name = path.name().unwrap_or_default().to_string();
                index.folders.insert(path, FolderInfo { name, created_at });
                results.entries_added += 1;
            }
        }
        for (path, created_at) in disk.files {
            if !index.files.contains_key(&path) {
                let name = path.name().unwrap_or_default().to_string();
                index.files.insert(
                    path,
                    FileInfo {
                        name,
                        category: None,
                        created_at,
                    },
                );
                results.entries_added += 1;
            }
        }

        if results.entries_added > 0 || results.entries_removed > 0 {
            txn.commit().await?;
        }

        info!(
            folders = results.folders_found,
            files = results.files_found,
            added = results.entries_added,
            removed = results.entries_removed,
            "library scan complete"
        );
        Ok(results)
    }

    /// Recursively scan directory
    fn scan_recursive<'a>(
        &'a self,
        dir: &'a Path,
        disk: &'a mut DiskTree,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = fs::read_dir(dir).await.map_err(|e| {
                LibraryError::storage(format!(
                    "Failed to read directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                LibraryError::storage(format!(
                    "Failed to read directory entry in {}: {}",
                    dir.display(),
                    e
                ))
            })? {
                let path = entry.path();
                if is_hidden(&path) || path == self.store.path() {
                    continue;
                }

                let metadata = match entry.metadata().await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                        continue;
                    }
                };

                let Some(logical) = self.logical_path(&path) else {
                    continue;
                };
                let created_at = metadata
                    .created()
                    .or_else(|_| metadata.modified())
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());

                if metadata.is_dir() {
                    disk.folders.insert(logical, created_at);
                    self.scan_recursive(&path, disk).await?;
                } else if AudioFormat::from_name(&entry.file_name().to_string_lossy()).is_some() {
                    disk.files.insert(logical, created_at);
                }
            }

            Ok(())
        })
    }

    /// Canonical path of an on-disk entry below the root
    fn logical_path(&self, path: &Path) -> Option<CanonicalPath> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let joined = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");

        match self.codec.normalize(&joined) {
            Ok(logical) if !logical.is_root() => Some(logical),
            Ok(_) => None,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping entry with unusable name");
                None
            }
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::Category;
    use tempfile::TempDir;

    fn p(raw: &str) -> CanonicalPath {
        PathCodec::default().normalize(raw).unwrap()
    }

    async fn setup(temp_dir: &TempDir) -> (PathBuf, Arc<MetadataStore>, LibraryScanner) {
        let root = temp_dir.path().join("audio");
        fs::create_dir_all(&root).await.unwrap();
        let codec = PathCodec::default();
        let store = Arc::new(MetadataStore::new(root.join("metadata.json"), codec.clone()));
        let scanner = LibraryScanner::new(root.clone(), store.clone(), codec);
        (root, store, scanner)
    }

    #[tokio::test]
    async fn test_reconcile_adds_orphans_and_skips_noise() {
        let temp_dir = TempDir::new().unwrap();
        let (root, store, scanner) = setup(&temp_dir).await;

        fs::create_dir_all(root.join("Stations/Nord")).await.unwrap();
        fs::write(root.join("Stations/Nord/a.mp3"), b"a").await.unwrap();
        fs::write(root.join("b.WAV"), b"b").await.unwrap();
        fs::write(root.join("notes.txt"), b"x").await.unwrap();
        fs::write(root.join(".concat-123.txt"), b"x").await.unwrap();
        fs::write(root.join("metadata.json"), b"{}").await.unwrap();

        let results = scanner.reconcile().await.unwrap();
        assert_eq!(results.folders_found, 2);
        assert_eq!(results.files_found, 2);
        assert_eq!(results.entries_added, 4);
        assert_eq!(results.entries_removed, 0);

        let index = store.load().await;
        assert_eq!(index.files[&p("Stations/Nord/a.mp3")].name, "a.mp3");
        assert!(index.files.contains_key(&p("b.WAV")));
        assert!(index.folders.contains_key(&p("Stations/Nord")));
    }

    #[tokio::test]
    async fn test_reconcile_drops_stale_and_keeps_enrichment() {
        let temp_dir = TempDir::new().unwrap();
        let (root, store, scanner) = setup(&temp_dir).await;

        fs::write(root.join("kept.mp3"), b"k").await.unwrap();
        let created_at = Utc::now();
        let mut txn = store.begin().await;
        let index = txn.index_mut();
        index.files.insert(
            p("kept.mp3"),
            FileInfo {
                name: "kept.mp3".to_string(),
                category: Some(Category::Messages),
                created_at,
            },
        );
        index.files.insert(
            p("gone.mp3"),
            FileInfo {
                name: "gone.mp3".to_string(),
                category: None,
                created_at,
            },
        );
        index.folders.insert(
            p("Gone"),
            FolderInfo {
                name: "Gone".to_string(),
                created_at,
            },
        );
        txn.commit().await.unwrap();

        let results = scanner.reconcile().await.unwrap();
        assert_eq!(results.entries_removed, 2);
        assert_eq!(results.entries_added, 0);

        let index = store.load().await;
        assert_eq!(index.files.len(), 1);
        assert_eq!(index.files[&p("kept.mp3")].category, Some(Category::Messages));
        assert!(index.folders.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let codec = PathCodec::default();
        let store = Arc::new(MetadataStore::new(temp_dir.path().join("m.json"), codec.clone()));
        let scanner = LibraryScanner::new(temp_dir.path().join("nope"), store, codec);

        assert!(matches!(
            scanner.reconcile().await,
            Err(LibraryError::InvalidPath(_))
        ));
    }
}
