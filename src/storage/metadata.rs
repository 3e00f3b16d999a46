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


//! Durable metadata index storage
//!
//! The index lives in a single JSON document below the audio root. Every
//! mutating operation runs inside a [`MetadataTxn`]: the store lock is held,
//! the index is loaded once, mutated, and written back once on `commit()`.
//! Dropping a transaction without committing discards its changes.
//!
//! A missing or unparsable document loads as the empty index. The
//! filesystem stays the source of truth for existence; the index only
//! enriches entries with category and creation time.

use crate::error::Result;
use crate::file::manager::FileManager;
use crate::file::paths::PathCodec;
use crate::storage::models::{MetadataIndex, RawMetadataIndex};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// JSON-backed metadata store with a single-writer lock
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    codec: PathCodec,
    files: FileManager,
    lock: Mutex<()>,
}

impl MetadataStore {
    /// Create a store for the document at `path`
    pub fn new(path: PathBuf, codec: PathCodec) -> Self {
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            path,
            codec,
            files: FileManager::new(parent),
            lock: Mutex::new(()),
        }
    }

    /// Location of the JSON document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the index, falling back to an empty one
    pub async fn load(&self) -> MetadataIndex {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "metadata document absent, starting empty");
                return MetadataIndex::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "metadata document unreadable, using empty index");
                return MetadataIndex::new();
            }
        };

        match serde_json::from_str::<RawMetadataIndex>(&content) {
            Ok(raw) => {
                let (index, dropped) = raw.into_index(&self.codec);
                if dropped > 0 {
                    warn!(dropped, "ignored metadata entries with invalid paths");
                }
                index
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "metadata document corrupt, using empty index");
                MetadataIndex::new()
            }
        }
    }

    /// Write the full index
    pub async fn save(&self, index: &MetadataIndex) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            self.files.ensure_directory_exists(parent).await?;
        }
        let contents = serde_json::to_vec_pretty(index)?;
        self.files.atomic_write(&self.path, &contents).await?;
        debug!(
            folders = index.folders.len(),
            files = index.files.len(),
            "metadata saved"
        );
        Ok(())
    }

    /// Start a read-modify-write cycle
    ///
    /// Waits for any other open transaction to finish first.
    pub async fn begin(&self) -> MetadataTxn<'_> {
        let guard = self.lock.lock().await;
        let index = self.load().await;
        MetadataTxn {
            store: self,
            index,
            _guard: guard,
        }
    }

    /// Read-only copy of the last committed index
    ///
    /// Does not wait for open transactions; saves replace the document
    /// atomically, so a reader sees either the old or the new index.
    pub async fn snapshot(&self) -> MetadataIndex {
        self.load().await
    }
}

/// Open read-modify-write cycle on the metadata index
pub struct MetadataTxn<'a> {
    store: &'a MetadataStore,
    index: MetadataIndex,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> MetadataTxn<'a> {
    pub fn index_mut(&mut self) -> &mut MetadataIndex {
        &mut self.index
    }

    /// Persist the index and release the lock
    pub async fn commit(self) -> Result<()> {
        self.store.save(&self.index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{Category, FileInfo};
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> MetadataStore {
        MetadataStore::new(
            temp_dir.path().join("audio").join("metadata.json"),
            PathCodec::default(),
        )
    }

    fn entry(name: &str) -> FileInfo {
        FileInfo {
            name: name.to_string(),
            category: Some(Category::Messages),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        assert_eq!(store.load().await, MetadataIndex::new());
    }

    #[tokio::test]
    async fn test_load_corrupt_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        fs::create_dir_all(store.path().parent().unwrap()).await.unwrap();
        fs::write(store.path(), b"{ not json").await.unwrap();

        assert_eq!(store.load().await, MetadataIndex::new());
    }

    #[tokio::test]
    async fn test_commit_persists_and_drop_discards() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let codec = PathCodec::default();

        let mut txn = store.begin().await;
        txn.index_mut()
            .files
            .insert(codec.normalize("a.mp3").unwrap(), entry("a.mp3"));
        txn.commit().await.unwrap();

        {
            let mut txn = store.begin().await;
            txn.index_mut()
                .files
                .insert(codec.normalize("b.mp3").unwrap(), entry("b.mp3"));
        }

        let index = store.load().await;
        assert_eq!(index.files.len(), 1);
        assert!(index.files.contains_key(&codec.normalize("a.mp3").unwrap()));
    }

    #[tokio::test]
    async fn test_transactions_are_serialized() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(store(&temp_dir));
        let codec = PathCodec::default();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let path = codec.normalize(&format!("clip{}.mp3", i)).unwrap();
            handles.push(tokio::spawn(async move {
                let mut txn = store.begin().await;
                txn.index_mut().files.insert(path, entry("clip.mp3"));
                tokio::task::yield_now().await;
                txn.commit().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.snapshot().await.files.len(), 8);
    }
}
