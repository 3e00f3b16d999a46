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


//! Metadata index models
//!
//! The index is a flat mapping from canonical paths to folder and file
//! records. The tree is implied by path containment; nothing holds a direct
//! reference to another entry.
//!
//! # JSON Adaptations
//! - Dates are stored as RFC 3339 strings (`createdAt`)
//! - Categories are stored by their English label; the legacy French labels
//!   are accepted when reading
//! - Both maps default to empty so older documents holding only `files` load
//! - An unknown category string loads as "no category" instead of failing
//!   the whole document

use crate::file::paths::{CanonicalPath, PathCodec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CATEGORY
// ============================================================================

/// Closed vocabulary of clip categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(alias = "Non classé")]
    Uncategorized,
    #[serde(alias = "Annonces")]
    Announcements,
    Stations,
    #[serde(alias = "Horaires")]
    Schedules,
    Messages,
    #[serde(alias = "Effets sonores")]
    SoundEffects,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 6] = [
        Category::Uncategorized,
        Category::Announcements,
        Category::Stations,
        Category::Schedules,
        Category::Messages,
        Category::SoundEffects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Uncategorized => "Uncategorized",
            Category::Announcements => "Announcements",
            Category::Stations => "Stations",
            Category::Schedules => "Schedules",
            Category::Messages => "Messages",
            Category::SoundEffects => "SoundEffects",
        }
    }

    fn legacy_label(&self) -> &'static str {
        match self {
            Category::Uncategorized => "Non classé",
            Category::Announcements => "Annonces",
            Category::Stations => "Stations",
            Category::Schedules => "Horaires",
            Category::Messages => "Messages",
            Category::SoundEffects => "Effets sonores",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Uncategorized
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s || c.legacy_label() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Read a category leniently: unknown labels become `None`
fn lenient_category<'de, D>(deserializer: D) -> Result<Option<Category>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

// ============================================================================
// INDEX ENTRIES
// ============================================================================

/// Stored folder record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderInfo {
    #[serde(default)]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Stored file record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_category"
    )]
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
}

/// The durable metadata index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataIndex {
    #[serde(default)]
    pub folders: BTreeMap<CanonicalPath, FolderInfo>,
    #[serde(default)]
    pub files: BTreeMap<CanonicalPath, FileInfo>,
}

/// Index as read from disk, before keys are normalized
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawMetadataIndex {
    #[serde(default)]
    folders: BTreeMap<String, FolderInfo>,
    #[serde(default)]
    files: BTreeMap<String, FileInfo>,
}

impl RawMetadataIndex {
    /// Normalize keys and names of a freshly parsed document
    ///
    /// Keys that fail normalization are dropped; the count is returned so the
    /// caller can log it.
    pub(crate) fn into_index(self, codec: &PathCodec) -> (MetadataIndex, usize) {
        let mut index = MetadataIndex::default();
        let mut dropped = 0;

        for (key, mut info) in self.folders {
            match codec.normalize(&key) {
                Ok(path) if !path.is_root() => {
                    info.name = path.name().unwrap_or_default().to_string();
                    index.folders.insert(path, info);
                }
                _ => dropped += 1,
            }
        }

        for (key, mut info) in self.files {
            match codec.normalize(&key) {
                Ok(path) if !path.is_root() => {
                    info.name = path.name().unwrap_or_default().to_string();
                    index.files.insert(path, info);
                }
                _ => dropped += 1,
            }
        }

        (index, dropped)
    }
}

impl MetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert folder entries for every ancestor of `path` that is missing
    pub fn ensure_ancestors(&mut self, path: &CanonicalPath, now: DateTime<Utc>) -> usize {
        let mut added = 0;
        for ancestor in path.ancestors() {
            if !self.folders.contains_key(&ancestor) {
                let name = ancestor.name().unwrap_or_default().to_string();
                self.folders.insert(ancestor, FolderInfo { name, created_at: now });
                added += 1;
            }
        }
        added
    }

    /// Move `old` and every entry below it under `new`
    ///
    /// Only the entry at `old` itself changes its name; descendants keep
    /// their last segment. Returns the number of rewritten keys.
    pub fn rebase_subtree(&mut self, old: &CanonicalPath, new: &CanonicalPath) -> usize {
        let folders = rebase_map(&mut self.folders, old, new, |info, name| info.name = name);
        let files = rebase_map(&mut self.files, old, new, |info, name| info.name = name);
        folders + files
    }

    /// Remove `path` and every entry below it. Returns the number removed.
    pub fn remove_subtree(&mut self, path: &CanonicalPath) -> usize {
        let before = self.folders.len() + self.files.len();
        self.folders.retain(|key, _| !key.is_same_or_descendant_of(path));
        self.files.retain(|key, _| !key.is_same_or_descendant_of(path));
        before - (self.folders.len() + self.files.len())
    }
}

fn rebase_map<V>(
    map: &mut BTreeMap<CanonicalPath, V>,
    old: &CanonicalPath,
    new: &CanonicalPath,
    rename: impl Fn(&mut V, String),
) -> usize {
    let keys: Vec<CanonicalPath> = map
        .keys()
        .filter(|key| key.is_same_or_descendant_of(old))
        .cloned()
        .collect();

    for key in &keys {
        if let (Some(mut value), Some(target)) = (map.remove(key), key.rebase(old, new)) {
            if key == old {
                rename(&mut value, target.name().unwrap_or_default().to_string());
            }
            map.insert(target, value);
        }
    }

    keys.len()
}

// ============================================================================
// VIEWS
// ============================================================================

/// File as presented to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFile {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
}

impl AudioFile {
    pub fn from_entry(codec: &PathCodec, path: &CanonicalPath, info: &FileInfo) -> Self {
        Self {
            name: info.name.clone(),
            path: codec.view_path(path),
            category: info.category,
            created_at: info.created_at,
        }
    }
}

/// Folder as presented to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub name: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

impl Folder {
    pub fn from_entry(codec: &PathCodec, path: &CanonicalPath, info: &FolderInfo) -> Self {
        Self {
            name: info.name.clone(),
            path: codec.view_path(path),
            created_at: info.created_at,
        }
    }
}
