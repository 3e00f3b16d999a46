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


//! Library configuration
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. Optional TOML file
//! 3. Environment overrides (`ANNOUNCE_AUDIO_ROOT`, `ANNOUNCE_FFMPEG`,
//!    `ANNOUNCE_MERGE_TIMEOUT_SECS`)
//!
//! # Example
//! ```toml
//! audio_root = "/srv/announce/audio"
//! root_prefix = "/audio"
//! delete_missing_file = "tolerate"
//!
//! [upload]
//! max_bytes = 10485760
//!
//! [merge]
//! ffmpeg_binary = "/usr/bin/ffmpeg"
//! timeout_secs = 120
//! ```

use crate::audio::merger::MergeSettings;
use crate::audio::upload::UploadRules;
use crate::error::{LibraryError, Result};
use crate::file::paths::DEFAULT_ROOT_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_AUDIO_ROOT: &str = "ANNOUNCE_AUDIO_ROOT";
pub const ENV_FFMPEG: &str = "ANNOUNCE_FFMPEG";
pub const ENV_MERGE_TIMEOUT: &str = "ANNOUNCE_MERGE_TIMEOUT_SECS";

/// What deleting an already-missing file reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFilePolicy {
    /// Succeed silently
    Tolerate,
    /// Fail with `NotFound` (the metadata entry is still removed)
    Fail,
}

impl Default for MissingFilePolicy {
    fn default() -> Self {
        MissingFilePolicy::Fail
    }
}

/// Library configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// On-disk directory holding clips and the metadata document
    pub audio_root: PathBuf,
    /// Logical prefix prepended to paths in views
    pub root_prefix: String,
    /// Metadata document name, relative to `audio_root`
    pub metadata_file: String,
    pub upload: UploadRules,
    pub merge: MergeSettings,
    pub delete_missing_file: MissingFilePolicy,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            audio_root: default_audio_root(),
            root_prefix: DEFAULT_ROOT_PREFIX.to_string(),
            metadata_file: "metadata.json".to_string(),
            upload: UploadRules::default(),
            merge: MergeSettings::default(),
            delete_missing_file: MissingFilePolicy::default(),
        }
    }
}

impl LibraryConfig {
    /// Defaults rooted at `audio_root`
    pub fn with_root(audio_root: impl Into<PathBuf>) -> Self {
        Self {
            audio_root: audio_root.into(),
            ..Self::default()
        }
    }

    /// Load a TOML file; missing keys keep their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LibraryError::ConfigurationError(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Full load: optional file, then process environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        debug!(audio_root = %config.audio_root.display(), "configuration loaded");
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_AUDIO_ROOT).filter(|v| !v.is_empty()) {
            self.audio_root = PathBuf::from(root);
        }
        if let Some(binary) = lookup(ENV_FFMPEG).filter(|v| !v.is_empty()) {
            self.merge.ffmpeg_binary = binary;
        }
        if let Some(raw) = lookup(ENV_MERGE_TIMEOUT).filter(|v| !v.is_empty()) {
            self.merge.timeout_secs = raw.trim().parse().map_err(|_| {
                LibraryError::ConfigurationError(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_MERGE_TIMEOUT, raw
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.root_prefix.is_empty() && !self.root_prefix.starts_with('/') {
            return Err(LibraryError::ConfigurationError(format!(
                "root_prefix must be empty or start with '/': {}",
                self.root_prefix
            )));
        }
        if self.metadata_file.is_empty()
            || self.metadata_file.contains('/')
            || self.metadata_file.contains('\\')
        {
            return Err(LibraryError::ConfigurationError(format!(
                "metadata_file must be a plain file name: {}",
                self.metadata_file
            )));
        }
        if self.upload.max_bytes == 0 {
            return Err(LibraryError::ConfigurationError(
                "upload.max_bytes must be greater than zero".to_string(),
            ));
        }
        if self.merge.timeout_secs == 0 {
            return Err(LibraryError::ConfigurationError(
                "merge.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Location of the metadata document
    pub fn metadata_path(&self) -> PathBuf {
        self.audio_root.join(&self.metadata_file)
    }
}

/// Get default audio root for platform
pub fn default_audio_root() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut path = PathBuf::from(home);
            path.push("Library");
            path.push("Application Support");
            path.push("Announce");
            path.push("audio");
            return path;
        }
        return PathBuf::from("./audio");
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut path = PathBuf::from(home);
            path.push(".local");
            path.push("share");
            path.push("announce");
            path.push("audio");
            return path;
        }
        return PathBuf::from("./audio");
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            let mut path = PathBuf::from(appdata);
            path.push("Announce");
            path.push("audio");
            return path;
        }
        return PathBuf::from("./audio");
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        PathBuf::from("./audio")
    }
}
