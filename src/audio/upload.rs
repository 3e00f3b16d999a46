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


//! Upload constraints
//!
//! Checks run in a fixed order: size, declared media type, extension. The
//! first failing check decides the error, and nothing touches the disk
//! before all three pass.

use crate::error::{LibraryError, Result};
use crate::file::paths::extension_of;
use serde::{Deserialize, Serialize};

/// Default upload cap (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// A file received from the presentation layer
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Original client-side file name
    pub file_name: String,
    /// Declared media type
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Upload limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadRules {
    pub max_bytes: u64,
    pub allowed_mime_types: Vec<String>,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadRules {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_mime_types: vec![
                "audio/mpeg".to_string(),
                "audio/wav".to_string(),
                "audio/wave".to_string(),
            ],
            allowed_extensions: vec!["mp3".to_string(), "wav".to_string()],
        }
    }
}

impl UploadRules {
    /// Check an incoming file against the limits
    pub fn validate(&self, file: &IncomingFile) -> Result<()> {
        if file.size() > self.max_bytes {
            return Err(LibraryError::ValidationError(format!(
                "file is too large ({} bytes, max {} bytes)",
                file.size(),
                self.max_bytes
            )));
        }

        let mime = file.content_type.trim().to_lowercase();
        if !self.allowed_mime_types.iter().any(|m| m.eq_ignore_ascii_case(&mime)) {
            return Err(LibraryError::ValidationError(format!(
                "unsupported media type '{}'",
                file.content_type
            )));
        }

        let allowed_ext = extension_of(&file.file_name)
            .map(|ext| self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false);
        if !allowed_ext {
            return Err(LibraryError::ValidationError(format!(
                "unsupported file extension in '{}'",
                file.file_name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: LibraryError) -> String {
        match err {
            LibraryError::ValidationError(msg) => msg,
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_accepts_valid_upload() {
        let rules = UploadRules::default();
        let file = IncomingFile::new("greeting.MP3", "audio/mpeg", vec![0; 1024]);
        assert!(rules.validate(&file).is_ok());
    }

    #[test]
    fn test_size_checked_first() {
        let rules = UploadRules::default();
        let file = IncomingFile::new(
            "big.ogg",
            "audio/ogg",
            vec![0; (DEFAULT_MAX_UPLOAD_BYTES + 1) as usize],
        );
        assert!(message(rules.validate(&file).unwrap_err()).contains("too large"));
    }

    #[test]
    fn test_rejects_type_then_extension() {
        let rules = UploadRules::default();

        let file = IncomingFile::new("clip.mp3", "video/mp4", vec![1]);
        assert!(message(rules.validate(&file).unwrap_err()).contains("media type"));

        let file = IncomingFile::new("clip.ogg", "audio/wav", vec![1]);
        assert!(message(rules.validate(&file).unwrap_err()).contains("extension"));

        let file = IncomingFile::new("clip", "audio/wav", vec![1]);
        assert!(rules.validate(&file).is_err());
    }

    #[test]
    fn test_exact_cap_is_allowed() {
        let rules = UploadRules {
            max_bytes: 4,
            ..UploadRules::default()
        };
        let file = IncomingFile::new("a.wav", "audio/wave", vec![0; 4]);
        assert!(rules.validate(&file).is_ok());
    }
}
