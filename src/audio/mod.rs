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


//! Clip formats, upload rules and announcement assembly
//!
//! # Module Organization
//!
//! ## format
//! - `AudioFormat` - Supported clip formats (MP3, WAV)
//!
//! ## upload
//! - `IncomingFile` - Bytes plus declared name and media type
//! - `UploadRules` - Size, media type and extension limits
//!
//! ## merger
//! - `MediaMerger` - Capability joining ordered inputs into one file
//! - `FfmpegMerger` - Stream-copy concat through the FFmpeg concat demuxer
//! - `MergeSettings` - Binary location and time budget
//!
//! ## concat
//! - `ConcatenationPipeline` - Validate, merge, register
//! - `ConcatStage` - Pipeline stage reported in logs
//!
//! # FFmpeg Integration
//!
//! Concatenation requires FFmpeg in PATH, or the binary configured in
//! `MergeSettings::ffmpeg_binary`:
//! - macOS: `brew install ffmpeg`
//! - Linux: `apt-get install ffmpeg` or `yum install ffmpeg`
//! - Windows: Download from https://ffmpeg.org/download.html

pub mod concat;
pub mod format;
pub mod merger;
pub mod upload;

// Re-export commonly used types for convenience
pub use concat::{ConcatStage, ConcatenationPipeline};
pub use format::AudioFormat;
pub use merger::{render_manifest, FfmpegMerger, MediaMerger, MergeJob, MergeSettings};
pub use upload::{IncomingFile, UploadRules, DEFAULT_MAX_UPLOAD_BYTES};
