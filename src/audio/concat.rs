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


//! Announcement assembly
//!
//! Joins an ordered list of clips into one file at the library root and
//! registers it under the Announcements category.
//!
//! # Stages
//! `Validating -> Merging -> Registering -> Done`, or `Failed` from any stage.
//! - Validating: non-empty input, output name pattern, inputs exist,
//!   destination free
//! - Merging: write the concat list, run the merger into a hidden staging
//!   file, remove the list
//! - Registering: one metadata transaction that moves the staging file to
//!   its final name and inserts the output entry
//!
//! The merger never writes the final name, so a failed run only ever
//! deletes its own staging file. Moving into place refuses to overwrite; if
//! something claimed the output name during the merge, the run fails with
//! `Conflict`.
//!
//! The metadata lock is only taken for registration, so a long merge does
//! not block other library operations.

use crate::audio::format::AudioFormat;
use crate::audio::merger::{render_manifest, MediaMerger, MergeJob};
use crate::error::{LibraryError, Result};
use crate::file::manager::FileManager;
use crate::file::paths::{child_of, validate_output_name, CanonicalPath, PathCodec};
use crate::storage::metadata::MetadataStore;
use crate::storage::models::{AudioFile, Category, FileInfo};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Pipeline stage, reported in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatStage {
    Validating,
    Merging,
    Registering,
    Done,
    Failed,
}

impl fmt::Display for ConcatStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConcatStage::Validating => "validating",
            ConcatStage::Merging => "merging",
            ConcatStage::Registering => "registering",
            ConcatStage::Done => "done",
            ConcatStage::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Validated concatenation request
#[derive(Debug)]
struct ConcatPlan {
    inputs: Vec<CanonicalPath>,
    output: CanonicalPath,
    output_name: String,
    run_id: Uuid,
    /// Hidden merge target at the root, same extension as the output
    staging: CanonicalPath,
}

/// Sequential concatenation pipeline
pub struct ConcatenationPipeline {
    files: FileManager,
    store: Arc<MetadataStore>,
    codec: PathCodec,
    merger: Arc<dyn MediaMerger>,
}

impl ConcatenationPipeline {
    pub fn new(
        files: FileManager,
        store: Arc<MetadataStore>,
        codec: PathCodec,
        merger: Arc<dyn MediaMerger>,
    ) -> Self {
        Self {
            files,
            store,
            codec,
            merger,
        }
    }

    /// Concatenate `inputs` in order into `output_name` at the library root
    pub async fn concatenate(&self, inputs: &[String], output_name: &str) -> Result<AudioFile> {
        let mut stage = ConcatStage::Validating;
        debug!(%stage, inputs = inputs.len(), output = output_name, "concatenation requested");

        let result = self.run(inputs, output_name, &mut stage).await;
        match &result {
            Ok(file) => {
                stage = ConcatStage::Done;
                info!(%stage, path = %file.path, "announcement created");
            }
            Err(e) => {
                let failed_in = stage;
                stage = ConcatStage::Failed;
                if failed_in == ConcatStage::Validating {
                    debug!(%stage, %failed_in, error = %e, "concatenation rejected");
                } else {
                    error!(%stage, %failed_in, error = %e, "concatenation failed");
                }
            }
        }
        result
    }

    async fn run(
        &self,
        inputs: &[String],
        output_name: &str,
        stage: &mut ConcatStage,
    ) -> Result<AudioFile> {
        let plan = self.validate(inputs, output_name).await?;

        *stage = ConcatStage::Merging;
        self.merge(&plan).await?;

        *stage = ConcatStage::Registering;
        self.register(&plan).await
    }

    async fn validate(&self, inputs: &[String], output_name: &str) -> Result<ConcatPlan> {
        if inputs.is_empty() {
            return Err(LibraryError::EmptyInput);
        }
        if !validate_output_name(output_name) {
            return Err(LibraryError::InvalidOutputName(output_name.to_string()));
        }

        let inputs = inputs
            .iter()
            .map(|raw| self.codec.normalize(raw))
            .collect::<Result<Vec<_>>>()?;

        for input in &inputs {
            if input.is_root() || self.files.is_directory(input).await {
                return Err(LibraryError::invalid_path(format!("{} is not a file", input)));
            }
            if !self.files.exists(input).await {
                return Err(LibraryError::not_found(input.to_string()));
            }
            if input.name().and_then(AudioFormat::from_name).is_none() {
                return Err(LibraryError::invalid_path(format!("{} is not an audio clip", input)));
            }
        }

        let format = AudioFormat::from_name(output_name)
            .ok_or_else(|| LibraryError::InvalidOutputName(output_name.to_string()))?;
        let output = child_of(&CanonicalPath::root(), output_name)?;
        if self.files.exists(&output).await {
            return Err(LibraryError::conflict(format!("{} already exists", output)));
        }

        let run_id = Uuid::new_v4();
        let staging = child_of(
            &CanonicalPath::root(),
            &format!(".concat-{}.{}", run_id, format.to_extension()),
        )?;

        Ok(ConcatPlan {
            inputs,
            output,
            output_name: output_name.to_string(),
            run_id,
            staging,
        })
    }

    async fn merge(&self, plan: &ConcatPlan) -> Result<()> {
        let inputs: Vec<_> = plan.inputs.iter().map(|p| self.files.resolve(p)).collect();
        let manifest = self
            .files
            .library_path()
            .join(format!(".concat-{}.txt", plan.run_id));
        let job = MergeJob {
            manifest: manifest.clone(),
            destination: self.files.resolve(&plan.staging),
            inputs,
        };

        self.files
            .atomic_write(&manifest, render_manifest(&job.inputs).as_bytes())
            .await?;

        let merged = self.merger.concat(&job).await;

        if let Err(e) = self.files.safe_delete(&manifest).await {
            warn!(manifest = %manifest.display(), error = %e, "failed to remove concat list");
        }

        if merged.is_err() {
            self.discard_staging(plan).await;
        }

        merged
    }

    async fn register(&self, plan: &ConcatPlan) -> Result<AudioFile> {
        let mut txn = self.store.begin().await;
        if let Err(e) = self.files.rename(&plan.staging, &plan.output).await {
            self.discard_staging(plan).await;
            return Err(e);
        }

        let info = FileInfo {
            name: plan.output_name.clone(),
            category: Some(Category::Announcements),
            created_at: Utc::now(),
        };
        let view = AudioFile::from_entry(&self.codec, &plan.output, &info);
        txn.index_mut().files.insert(plan.output.clone(), info);
        txn.commit().await?;
        Ok(view)
    }

    async fn discard_staging(&self, plan: &ConcatPlan) {
        if let Err(e) = self.files.remove_file(&plan.staging).await {
            warn!(staging = %plan.staging, error = %e, "failed to remove partial output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::fs;

    /// Records jobs and writes the byte concatenation of the inputs
    #[derive(Default)]
    struct RecordingMerger {
        manifests: Mutex<Vec<String>>,
        destinations: Mutex<Vec<std::path::PathBuf>>,
        fail: bool,
        /// Root file another writer creates while the merge runs
        intruder: Option<&'static str>,
    }

    #[async_trait]
    impl MediaMerger for RecordingMerger {
        async fn concat(&self, job: &MergeJob) -> Result<()> {
            let manifest = fs::read_to_string(&job.manifest).await?;
            self.manifests.lock().unwrap().push(manifest);
            self.destinations.lock().unwrap().push(job.destination.clone());
            if let Some(name) = self.intruder {
                let root = job.manifest.parent().unwrap();
                fs::write(root.join(name), b"[upload]").await?;
            }
            if self.fail {
                fs::write(&job.destination, b"partial").await?;
                return Err(LibraryError::merge_failed("Invalid data found", Some(1)));
            }
            let mut out = Vec::new();
            for input in &job.inputs {
                out.extend(fs::read(input).await?);
            }
            fs::write(&job.destination, out).await?;
            Ok(())
        }
    }

    struct Fixture {
        _temp_dir: TempDir,
        files: FileManager,
        store: Arc<MetadataStore>,
        merger: Arc<RecordingMerger>,
        pipeline: ConcatenationPipeline,
    }

    async fn fixture(fail: bool) -> Fixture {
        fixture_with(RecordingMerger {
            fail,
            ..Default::default()
        })
        .await
    }

    async fn fixture_with(merger: RecordingMerger) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("audio");
        let codec = PathCodec::default();
        let files = FileManager::new(root.clone());
        let store = Arc::new(MetadataStore::new(root.join("metadata.json"), codec.clone()));
        let merger = Arc::new(merger);
        files
            .write_file(&codec.normalize("intro.mp3").unwrap(), b"[intro]")
            .await
            .unwrap();
        files
            .write_file(&codec.normalize("Stations/body.mp3").unwrap(), b"[body]")
            .await
            .unwrap();
        let pipeline = ConcatenationPipeline::new(files.clone(), store.clone(), codec, merger.clone());
        Fixture {
            _temp_dir: temp_dir,
            files,
            store,
            merger,
            pipeline,
        }
    }

    async fn leftover_manifests(files: &FileManager) -> usize {
        let mut count = 0;
        let mut entries = fs::read_dir(files.library_path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.file_name().to_string_lossy().starts_with(".concat-") {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn test_concatenate_registers_announcement() {
        let fx = fixture(false).await;

        let file = fx
            .pipeline
            .concatenate(
                &["/audio/Stations/body.mp3".to_string(), "intro.mp3".to_string()],
                "final.mp3",
            )
            .await
            .unwrap();

        assert_eq!(file.path, "/audio/final.mp3");
        assert_eq!(file.category, Some(Category::Announcements));

        let content = fs::read(fx.files.library_path().join("final.mp3")).await.unwrap();
        assert_eq!(content, b"[body][intro]");

        let manifests = fx.merger.manifests.lock().unwrap().clone();
        assert_eq!(manifests.len(), 1);
        let lines: Vec<&str> = manifests[0].lines().collect();
        assert!(lines[0].ends_with("body.mp3'"));
        assert!(lines[1].ends_with("intro.mp3'"));

        let destinations = fx.merger.destinations.lock().unwrap().clone();
        let staged = destinations[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(staged.starts_with(".concat-") && staged.ends_with(".mp3"));

        assert_eq!(leftover_manifests(&fx.files).await, 0);
        let index = fx.store.load().await;
        let entry = &index.files[&PathCodec::default().normalize("final.mp3").unwrap()];
        assert_eq!(entry.category, Some(Category::Announcements));
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let fx = fixture(false).await;

        let err = fx.pipeline.concatenate(&[], "final.mp3").await.unwrap_err();
        assert!(matches!(err, LibraryError::EmptyInput));

        let err = fx
            .pipeline
            .concatenate(&["intro.mp3".to_string()], "../final.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::InvalidOutputName(_)));

        let err = fx
            .pipeline
            .concatenate(&["missing.mp3".to_string()], "final.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::NotFound(_)));

        let err = fx
            .pipeline
            .concatenate(&["Stations".to_string()], "final.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::InvalidPath(_)));

        fx.files
            .write_file(&PathCodec::default().normalize("notes.txt").unwrap(), b"x")
            .await
            .unwrap();
        let err = fx
            .pipeline
            .concatenate(&["notes.txt".to_string()], "final.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::InvalidPath(_)));

        let err = fx
            .pipeline
            .concatenate(&["Stations/body.mp3".to_string()], "intro.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Conflict(_)));

        assert!(fx.merger.manifests.lock().unwrap().is_empty());
        assert!(fx.store.load().await.files.is_empty());
    }

    #[tokio::test]
    async fn test_merge_failure_cleans_up() {
        let fx = fixture(true).await;

        let err = fx
            .pipeline
            .concatenate(&["intro.mp3".to_string()], "final.mp3")
            .await
            .unwrap_err();

        assert!(matches!(err, LibraryError::MergeFailed { exit_code: Some(1), .. }));
        assert_eq!(leftover_manifests(&fx.files).await, 0);
        assert!(!fx.files.library_path().join("final.mp3").exists());
        assert!(fx.store.load().await.files.is_empty());
    }

    #[tokio::test]
    async fn test_failed_merge_keeps_file_created_meanwhile() {
        let fx = fixture_with(RecordingMerger {
            fail: true,
            intruder: Some("final.mp3"),
            ..Default::default()
        })
        .await;

        let err = fx
            .pipeline
            .concatenate(&["intro.mp3".to_string()], "final.mp3")
            .await
            .unwrap_err();

        assert!(matches!(err, LibraryError::MergeFailed { .. }));
        let content = fs::read(fx.files.library_path().join("final.mp3")).await.unwrap();
        assert_eq!(content, b"[upload]");
        assert_eq!(leftover_manifests(&fx.files).await, 0);
    }

    #[tokio::test]
    async fn test_output_claimed_during_merge_is_conflict() {
        let fx = fixture_with(RecordingMerger {
            intruder: Some("final.mp3"),
            ..Default::default()
        })
        .await;

        let err = fx
            .pipeline
            .concatenate(&["intro.mp3".to_string()], "final.mp3")
            .await
            .unwrap_err();

        assert!(matches!(err, LibraryError::Conflict(_)));
        let content = fs::read(fx.files.library_path().join("final.mp3")).await.unwrap();
        assert_eq!(content, b"[upload]");
        assert_eq!(leftover_manifests(&fx.files).await, 0);
        assert!(fx.store.load().await.files.is_empty());
    }
}
