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


//! Metadata storage and models
//!
//! This module keeps the JSON metadata index that mirrors the on-disk
//! folder tree and enriches files with a category and creation time.
//!
//! # Document Layout
//! ```json
//! {
//!   "folders": { "Stations": { "name": "Stations", "createdAt": "..." } },
//!   "files": {
//!     "Stations/greeting.mp3": {
//!       "name": "greeting.mp3",
//!       "category": "Uncategorized",
//!       "createdAt": "..."
//!     }
//!   }
//! }
//! ```
//!
//! # Usage Example
//! ```no_run
//! use announce_core::file::PathCodec;
//! use announce_core::storage::MetadataStore;
//!
//! # async fn example() -> announce_core::error::Result<()> {
//! let store = MetadataStore::new("/srv/audio/metadata.json".into(), PathCodec::default());
//!
//! let mut txn = store.begin().await;
//! let removed = txn.index_mut().remove_subtree(&PathCodec::default().normalize("Stations")?);
//! txn.commit().await?;
//! # let _ = removed;
//! # Ok(())
//! # }
//! ```

pub mod category;
pub mod metadata;
pub mod models;

// Re-export commonly used types
pub use category::{is_valid_category, CategoryIndex};
pub use metadata::{MetadataStore, MetadataTxn};
pub use models::{AudioFile, Category, FileInfo, Folder, FolderInfo, MetadataIndex};
