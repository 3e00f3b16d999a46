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


//! Category tagging for files

use crate::error::{LibraryError, Result};
use crate::file::paths::PathCodec;
use crate::storage::metadata::MetadataStore;
use crate::storage::models::{AudioFile, Category};
use std::sync::Arc;
use tracing::info;

/// Whether `label` names one of the fixed categories
pub fn is_valid_category(label: &str) -> bool {
    label.parse::<Category>().is_ok()
}

/// Reads and writes the category field of file entries
#[derive(Debug, Clone)]
pub struct CategoryIndex {
    store: Arc<MetadataStore>,
    codec: PathCodec,
}

impl CategoryIndex {
    pub fn new(store: Arc<MetadataStore>, codec: PathCodec) -> Self {
        Self { store, codec }
    }

    /// Overwrite the category of a registered file
    pub async fn set_category(&self, file_path: &str, category: &str) -> Result<AudioFile> {
        let category: Category = category
            .parse()
            .map_err(LibraryError::InvalidCategory)?;
        let path = self.codec.normalize(file_path)?;

        let mut txn = self.store.begin().await;
        let view = {
            let info = txn
                .index_mut()
                .files
                .get_mut(&path)
                .ok_or_else(|| LibraryError::UnknownFile(path.to_string()))?;
            info.category = Some(category);
            AudioFile::from_entry(&self.codec, &path, info)
        };
        txn.commit().await?;

        info!(path = %path, %category, "category updated");
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::FileInfo;
    use chrono::Utc;
    use tempfile::TempDir;

    async fn setup(temp_dir: &TempDir) -> CategoryIndex {
        let codec = PathCodec::default();
        let store = Arc::new(MetadataStore::new(
            temp_dir.path().join("metadata.json"),
            codec.clone(),
        ));
        let mut txn = store.begin().await;
        txn.index_mut().files.insert(
            codec.normalize("Stations/a.mp3").unwrap(),
            FileInfo {
                name: "a.mp3".to_string(),
                category: None,
                created_at: Utc::now(),
            },
        );
        txn.commit().await.unwrap();
        CategoryIndex::new(store, codec)
    }

    #[test]
    fn test_is_valid_category() {
        assert!(is_valid_category("Schedules"));
        assert!(is_valid_category("Horaires"));
        assert!(!is_valid_category("schedules"));
        assert!(!is_valid_category(""));
    }

    #[tokio::test]
    async fn test_set_category() {
        let temp_dir = TempDir::new().unwrap();
        let index = setup(&temp_dir).await;

        let file = index
            .set_category("/audio/Stations/a.mp3", "Stations")
            .await
            .unwrap();
        assert_eq!(file.category, Some(Category::Stations));
        assert_eq!(file.name, "a.mp3");
    }

    #[tokio::test]
    async fn test_set_category_errors() {
        let temp_dir = TempDir::new().unwrap();
        let index = setup(&temp_dir).await;

        let err = index.set_category("Stations/a.mp3", "Jingles").await.unwrap_err();
        assert!(matches!(err, LibraryError::InvalidCategory(_)));

        let err = index.set_category("Stations/b.mp3", "Messages").await.unwrap_err();
        assert!(matches!(err, LibraryError::UnknownFile(_)));
    }
}
