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


//! Announce Core
//!
//! Audio clip library management: a folder tree of MP3/WAV clips under one
//! audio root, mirrored by a JSON metadata index that adds a category and
//! creation time to each entry, plus assembly of announcements by
//! stream-copy concatenation through FFmpeg.
//!
//! # Modules
//! - `file` - Paths, filesystem primitives, tree operations, scanner
//! - `storage` - Metadata index, transactions, categories
//! - `audio` - Formats, upload rules, merge tool, concatenation pipeline
//! - `library` - Facade exposing the operation table
//! - `playback` - Single-slot playback session state
//! - `config`, `logging`, `error` - Ambient plumbing

pub mod audio;
pub mod config;
pub mod error;
pub mod file;
pub mod library;
pub mod logging;
pub mod playback;
pub mod storage;

pub use audio::{FfmpegMerger, IncomingFile, MediaMerger, MergeJob};
pub use config::{LibraryConfig, MissingFilePolicy};
pub use error::{LibraryError, Result};
pub use library::{AudioLibrary, ConcatResponse, ListResponse, PathResponse, RenameResponse};
pub use logging::init_logging;
pub use playback::PlaybackSession;
pub use storage::{AudioFile, Category, Folder};
