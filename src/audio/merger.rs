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


//! External merge tool
//!
//! # Stream-copy concat
//! - Command: `ffmpeg -hide_banner -f concat -safe 0 -i list.txt -c copy -n out.mp3`
//! - The list file holds one `file '<absolute path>'` line per input, in order
//! - `-c copy` joins containers without re-encoding, so every input must
//!   share codec and sample format; FFmpeg rejects mismatches itself
//! - `-n` never overwrites an existing destination
//!
//! The merge step is a capability ([`MediaMerger`]) so the concatenation
//! pipeline can run against a fake in tests.

use crate::error::{LibraryError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Longest stderr excerpt carried in a `MergeFailed` error
const MAX_DIAGNOSTIC_BYTES: usize = 4096;

/// Default merge time budget
pub const DEFAULT_MERGE_TIMEOUT_SECS: u64 = 300;

/// One merge request
#[derive(Debug, Clone)]
pub struct MergeJob {
    /// Absolute input locations, in playback order
    pub inputs: Vec<PathBuf>,
    /// Concat list file already written for the job
    pub manifest: PathBuf,
    /// Absolute output location
    pub destination: PathBuf,
}

/// Capability that joins ordered inputs into one output file
#[async_trait]
pub trait MediaMerger: Send + Sync {
    async fn concat(&self, job: &MergeJob) -> Result<()>;
}

/// Merge tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    pub ffmpeg_binary: String,
    pub timeout_secs: u64,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            timeout_secs: DEFAULT_MERGE_TIMEOUT_SECS,
        }
    }
}

/// Render the concat list for `inputs`
///
/// Single quotes are closed, escaped and reopened (`'\''`) as the concat
/// demuxer expects.
pub fn render_manifest(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|path| {
            let escaped = path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

/// FFmpeg-backed merger
#[derive(Debug, Clone)]
pub struct FfmpegMerger {
    binary: String,
    timeout: Duration,
}

impl FfmpegMerger {
    pub fn new(settings: &MergeSettings) -> Self {
        Self {
            binary: settings.ffmpeg_binary.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    /// Build FFmpeg argument list for a job
    fn build_command(manifest: &Path, destination: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            manifest.to_string_lossy().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-n".to_string(),
            destination.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl MediaMerger for FfmpegMerger {
    async fn concat(&self, job: &MergeJob) -> Result<()> {
        let args = Self::build_command(&job.manifest, &job.destination);
        debug!(binary = %self.binary, inputs = job.inputs.len(), "starting ffmpeg concat");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LibraryError::MergeToolNotFound
                } else {
                    LibraryError::merge_failed(format!("Failed to execute ffmpeg: {}", e), None)
                }
            })?;

        let stderr = child.stderr.take().ok_or_else(|| {
            LibraryError::merge_failed("Failed to capture ffmpeg stderr", None)
        })?;

        // Drain stderr so the child never blocks on a full pipe
        let collector = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut diagnostics = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                trace!(target: "ffmpeg", "{}", line);
                diagnostics.push_str(&line);
                diagnostics.push('\n');
            }
            diagnostics
        });

        let status = match timeout(self.timeout, child.wait()).await {
            Ok(status) => status.map_err(|e| {
                LibraryError::merge_failed(format!("FFmpeg process failed: {}", e), None)
            })?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill timed out ffmpeg process");
                }
                collector.abort();
                return Err(LibraryError::Timeout(self.timeout.as_secs()));
            }
        };

        let diagnostics = collector.await.unwrap_or_default();

        if !status.success() {
            return Err(LibraryError::merge_failed(
                tail(diagnostics.trim_end(), MAX_DIAGNOSTIC_BYTES),
                status.code(),
            ));
        }

        Ok(())
    }
}

/// Last `max_bytes` of `text`, cut on a character boundary
fn tail(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_manifest_preserves_order() {
        let inputs = vec![
            PathBuf::from("/srv/audio/intro.mp3"),
            PathBuf::from("/srv/audio/body.mp3"),
        ];
        assert_eq!(
            render_manifest(&inputs),
            "file '/srv/audio/intro.mp3'\nfile '/srv/audio/body.mp3'\n"
        );
    }

    #[test]
    fn test_render_manifest_escapes_quotes() {
        let inputs = vec![PathBuf::from("/srv/audio/l'annonce.mp3")];
        assert_eq!(
            render_manifest(&inputs),
            "file '/srv/audio/l'\\''annonce.mp3'\n"
        );
    }

    #[test]
    fn test_build_command_uses_stream_copy() {
        let cmd = FfmpegMerger::build_command(Path::new("/tmp/list.txt"), Path::new("/srv/out.mp3"));
        let joined = cmd.join(" ");
        assert!(joined.contains("-f concat -safe 0 -i /tmp/list.txt"));
        assert!(joined.contains("-c copy"));
        assert_eq!(cmd.last().map(String::as_str), Some("/srv/out.mp3"));
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("aéb", 2), "b");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let merger = FfmpegMerger::new(&MergeSettings {
            ffmpeg_binary: "definitely-not-ffmpeg-xyz".to_string(),
            timeout_secs: 5,
        });
        let job = MergeJob {
            inputs: vec![],
            manifest: PathBuf::from("/nonexistent/list.txt"),
            destination: PathBuf::from("/nonexistent/out.mp3"),
        };
        let err = merger.concat(&job).await.unwrap_err();
        assert!(matches!(err, LibraryError::MergeToolNotFound));
    }

    /// Executable stand-in for ffmpeg
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-ffmpeg.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().to_string()
    }

    #[cfg(unix)]
    fn job_in(dir: &Path) -> MergeJob {
        MergeJob {
            inputs: vec![dir.join("a.mp3")],
            manifest: dir.join("list.txt"),
            destination: dir.join("out.mp3"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_tool() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let merger = FfmpegMerger::new(&MergeSettings {
            ffmpeg_binary: fake_ffmpeg(temp_dir.path(), "sleep 30"),
            timeout_secs: 1,
        });

        let started = std::time::Instant::now();
        let err = merger.concat(&job_in(temp_dir.path())).await.unwrap_err();
        assert!(matches!(err, LibraryError::Timeout(1)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let merger = FfmpegMerger::new(&MergeSettings {
            ffmpeg_binary: fake_ffmpeg(
                temp_dir.path(),
                "echo 'list.txt: Invalid data found when processing input' >&2\nexit 1",
            ),
            timeout_secs: 5,
        });

        match merger.concat(&job_in(temp_dir.path())).await.unwrap_err() {
            LibraryError::MergeFailed {
                diagnostics,
                exit_code,
            } => {
                assert_eq!(exit_code, Some(1));
                assert!(diagnostics.contains("Invalid data found"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let merger = FfmpegMerger::new(&MergeSettings {
            ffmpeg_binary: fake_ffmpeg(temp_dir.path(), "echo 'progress' >&2\nexit 0"),
            timeout_secs: 5,
        });

        merger.concat(&job_in(temp_dir.path())).await.unwrap();
    }
}
