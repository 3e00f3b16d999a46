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


//! Logical path normalization and name sanitization
//!
//! Every folder and file in the library is addressed by a [`CanonicalPath`]:
//! a `/`-separated path relative to the audio root, without leading or
//! trailing separators. The root itself is the empty path and is never
//! stored in the metadata index.
//!
//! # Rules
//! - The configured root prefix (`/audio` by default) is stripped when it is
//!   a whole leading segment; `/audiofoo` is a folder called `audiofoo`
//! - Backslashes are treated as separators
//! - Empty segments, `.` and `..` are rejected
//! - Reserved characters `\ ? % * : | " < >` and control characters are
//!   rejected inside a segment
//! - Descendant tests always compare against `parent + "/"`, so `foo` never
//!   matches `foobar`

use crate::error::{LibraryError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default logical prefix under which the library is exposed
pub const DEFAULT_ROOT_PREFIX: &str = "/audio";

/// Maximum length of a single path segment in bytes
const MAX_COMPONENT_LENGTH: usize = 255;

/// Characters that may never appear inside a file or folder name
const RESERVED_CHARS: [char; 10] = ['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

lazy_static! {
    static ref OUTPUT_NAME_REGEX: Regex = Regex::new(r"(?i)^[a-z0-9\-_ ]+\.(mp3|wav)$").unwrap();
}

/// Normalized, root-relative identifier of a folder or file
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// The library root (empty path)
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments from the root down
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment, `None` for the root
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.0.rsplit('/').next()
        }
    }

    /// Parent folder, `None` for the root
    pub fn parent(&self) -> Option<CanonicalPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Proper ancestors, excluding the root, ordered top-down
    pub fn ancestors(&self) -> Vec<CanonicalPath> {
        let mut result = Vec::new();
        let mut current = self.parent();
        while let Some(path) = current {
            if path.is_root() {
                break;
            }
            current = path.parent();
            result.push(path);
        }
        result.reverse();
        result
    }

    /// Strict descendant test using the path-plus-separator rule
    pub fn is_descendant_of(&self, ancestor: &CanonicalPath) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }

    pub fn is_same_or_descendant_of(&self, ancestor: &CanonicalPath) -> bool {
        self == ancestor || self.is_descendant_of(ancestor)
    }

    /// Re-root this path from `old` to `new`
    ///
    /// Returns `None` when the path is neither `old` nor below it.
    pub fn rebase(&self, old: &CanonicalPath, new: &CanonicalPath) -> Option<CanonicalPath> {
        if self == old {
            return Some(new.clone());
        }
        if !self.is_descendant_of(old) {
            return None;
        }
        let rest = if old.is_root() {
            self.0.as_str()
        } else {
            &self.0[old.0.len() + 1..]
        };
        Some(join_raw(new, rest))
    }

    /// Location of this path below an on-disk base directory
    pub fn to_fs_path(&self, base: &Path) -> PathBuf {
        let mut path = base.to_path_buf();
        for segment in self.segments() {
            path.push(segment);
        }
        path
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Normalizes logical paths against a root prefix
#[derive(Debug, Clone)]
pub struct PathCodec {
    root_prefix: String,
}

impl Default for PathCodec {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_PREFIX)
    }
}

impl PathCodec {
    pub fn new(root_prefix: &str) -> Self {
        Self {
            root_prefix: root_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root_prefix(&self) -> &str {
        &self.root_prefix
    }

    /// Normalize a raw logical path
    ///
    /// A leading `/` without the root prefix is still read as root-relative,
    /// so `/Stations` and `/audio/Stations` name the same folder.
    pub fn normalize(&self, raw: &str) -> Result<CanonicalPath> {
        let unified = raw.replace('\\', "/");
        let mut rest = unified.as_str();

        if !self.root_prefix.is_empty() {
            if rest == self.root_prefix {
                rest = "";
            } else if let Some(stripped) = rest
                .strip_prefix(self.root_prefix.as_str())
                .and_then(|r| r.strip_prefix('/'))
            {
                rest = stripped;
            }
        }

        let rest = rest.strip_prefix('/').unwrap_or(rest);
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        if rest.is_empty() {
            return Ok(CanonicalPath::root());
        }

        for segment in rest.split('/') {
            validate_segment(segment).map_err(|e| {
                LibraryError::invalid_path(format!("{}: {}", raw, e))
            })?;
        }

        Ok(CanonicalPath(rest.to_string()))
    }

    /// Public path of an entry: root prefix plus canonical path
    pub fn view_path(&self, path: &CanonicalPath) -> String {
        if path.is_root() {
            self.root_prefix.clone()
        } else {
            format!("{}/{}", self.root_prefix, path.as_str())
        }
    }
}

/// Check a single path segment, returning the reason it is rejected
fn validate_segment(segment: &str) -> std::result::Result<(), String> {
    if segment.is_empty() {
        return Err("empty path segment".to_string());
    }
    if segment == "." || segment == ".." {
        return Err(format!("traversal segment '{}'", segment));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| RESERVED_CHARS.contains(c) || c.is_control())
    {
        return Err(format!("reserved character {:?} in '{}'", c, segment));
    }
    if segment.len() > MAX_COMPONENT_LENGTH {
        return Err(format!(
            "segment longer than {} bytes",
            MAX_COMPONENT_LENGTH
        ));
    }
    Ok(())
}

/// Sanitize a user-supplied file or folder name
///
/// Reserved and control characters become `-`, surrounding whitespace and
/// leading dots are removed. Names that end up empty or too long are
/// rejected rather than truncated.
pub fn sanitize_name(raw: &str) -> Result<String> {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '-'
            } else {
                c
            }
        })
        .collect();

    let result = replaced.trim().trim_start_matches('.').trim_start().to_string();

    if result.is_empty() {
        return Err(LibraryError::invalid_name(format!(
            "'{}' is empty after sanitization",
            raw
        )));
    }
    if result.len() > MAX_COMPONENT_LENGTH {
        return Err(LibraryError::invalid_name(format!(
            "name longer than {} bytes",
            MAX_COMPONENT_LENGTH
        )));
    }

    Ok(result)
}

/// Whether `name` is acceptable as a concatenation destination
pub fn validate_output_name(name: &str) -> bool {
    OUTPUT_NAME_REGEX.is_match(name)
}

/// Join a validated name below `parent`
pub fn child_of(parent: &CanonicalPath, name: &str) -> Result<CanonicalPath> {
    validate_segment(name).map_err(LibraryError::InvalidName)?;
    Ok(join_raw(parent, name))
}

fn join_raw(parent: &CanonicalPath, rest: &str) -> CanonicalPath {
    if parent.is_root() {
        CanonicalPath(rest.to_string())
    } else {
        CanonicalPath(format!("{}/{}", parent.as_str(), rest))
    }
}

/// Lowercased extension of a name, if any
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> CanonicalPath {
        PathCodec::default().normalize(raw).unwrap()
    }

    #[test]
    fn test_normalize_strips_root_prefix() {
        let codec = PathCodec::default();
        assert_eq!(codec.normalize("/audio/Stations").unwrap().as_str(), "Stations");
        assert_eq!(codec.normalize("/audio").unwrap(), CanonicalPath::root());
        assert_eq!(codec.normalize("/audio/").unwrap(), CanonicalPath::root());
        assert_eq!(codec.normalize("").unwrap(), CanonicalPath::root());
        assert_eq!(codec.normalize("/").unwrap(), CanonicalPath::root());
        assert_eq!(codec.normalize("/Stations/a.mp3").unwrap().as_str(), "Stations/a.mp3");
        assert_eq!(codec.normalize("Stations/").unwrap().as_str(), "Stations");
    }

    #[test]
    fn test_normalize_keeps_prefix_lookalikes() {
        let codec = PathCodec::default();
        assert_eq!(codec.normalize("/audiofoo/x").unwrap().as_str(), "audiofoo/x");
    }

    #[test]
    fn test_normalize_backslashes() {
        let codec = PathCodec::default();
        assert_eq!(
            codec.normalize("\\audio\\Stations\\a.wav").unwrap().as_str(),
            "Stations/a.wav"
        );
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        let codec = PathCodec::default();
        for raw in [
            "/audio/../etc",
            "a/../b",
            "./a",
            "a//b",
            "a/b?",
            "a:b",
            "C:/windows",
            "a/b*c",
            "x|y",
            "q\"uote",
            "<tag>",
            "100%",
            "bad\u{0}name",
        ] {
            assert!(
                matches!(codec.normalize(raw), Err(LibraryError::InvalidPath(_))),
                "expected rejection for {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("my:file?.mp3").unwrap(), "my-file-.mp3");
        assert_eq!(sanitize_name("a/b\\c").unwrap(), "a-b-c");
        assert_eq!(sanitize_name("..hidden").unwrap(), "hidden");
        assert_eq!(sanitize_name("  Gares  ").unwrap(), "Gares");
        assert!(matches!(sanitize_name("..."), Err(LibraryError::InvalidName(_))));
        assert!(matches!(sanitize_name("   "), Err(LibraryError::InvalidName(_))));
        assert!(sanitize_name(&"a".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_output_name() {
        assert!(validate_output_name("final.mp3"));
        assert!(validate_output_name("Annonce Gare_2-B.WAV"));
        assert!(!validate_output_name("final.ogg"));
        assert!(!validate_output_name("../final.mp3"));
        assert!(!validate_output_name("dir/final.mp3"));
        assert!(!validate_output_name(".mp3"));
        assert!(!validate_output_name("final.mp3.exe"));
    }

    #[test]
    fn test_child_of() {
        assert_eq!(child_of(&CanonicalPath::root(), "Stations").unwrap().as_str(), "Stations");
        assert_eq!(child_of(&p("Stations"), "Nord").unwrap().as_str(), "Stations/Nord");
        assert!(child_of(&p("Stations"), "..").is_err());
        assert!(child_of(&p("Stations"), "a/b").is_err());
    }

    #[test]
    fn test_descendant_uses_separator() {
        let foo = p("audio2/foo");
        assert!(p("audio2/foo/bar").is_descendant_of(&foo));
        assert!(!p("audio2/foobar").is_descendant_of(&foo));
        assert!(!foo.is_descendant_of(&foo));
        assert!(foo.is_same_or_descendant_of(&foo));
        assert!(foo.is_descendant_of(&CanonicalPath::root()));
    }

    #[test]
    fn test_rebase() {
        let old = p("Stations");
        let new = p("Archive/Gares");
        assert_eq!(p("Stations").rebase(&old, &new), Some(new.clone()));
        assert_eq!(
            p("Stations/Nord/a.mp3").rebase(&old, &new).unwrap().as_str(),
            "Archive/Gares/Nord/a.mp3"
        );
        assert_eq!(p("StationsX/a.mp3").rebase(&old, &new), None);
    }

    #[test]
    fn test_parent_name_ancestors() {
        let path = p("a/b/c.mp3");
        assert_eq!(path.name(), Some("c.mp3"));
        assert_eq!(path.parent().unwrap().as_str(), "a/b");
        assert_eq!(p("a").parent(), Some(CanonicalPath::root()));
        assert_eq!(CanonicalPath::root().parent(), None);
        let ancestors: Vec<String> = path.ancestors().iter().map(|a| a.to_string()).collect();
        assert_eq!(ancestors, vec!["a", "a/b"]);
    }

    #[test]
    fn test_view_path() {
        let codec = PathCodec::default();
        assert_eq!(codec.view_path(&p("Stations/a.mp3")), "/audio/Stations/a.mp3");
        assert_eq!(codec.view_path(&CanonicalPath::root()), "/audio");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.MP3"), Some("mp3".to_string()));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of(".wav"), None);
    }
}
