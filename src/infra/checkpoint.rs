// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores learner state using Burn's CompactRecorder.
//
// What a checkpoint directory holds:
//   model.mpk           — all learned parameters
//   checkpoint.json     — the iteration counter at save time
//   train_config.json   — the run configuration, so inference
//                         can rebuild the same architecture
//
// Saving writes to staging files first and renames them over
// the previous ones, so a checkpoint is always either the old
// snapshot or the new one. `checkpoint.json` is renamed last.
//
// Loading distinguishes the two fatal cases:
//   CheckpointMissing — nothing saved at this path yet
//   CheckpointCorrupt — files exist but cannot be decoded

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    module::Module,
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

const MODEL_STEM: &str = "model";
const STAGING_STEM: &str = "model_staging";
const STATE_FILE: &str = "checkpoint.json";
const CONFIG_FILE: &str = "train_config.json";

/// Progress stored next to the weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub iteration: usize,
}

/// Manages the files of one checkpoint directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True once a complete snapshot has been written.
    pub fn exists(&self) -> bool {
        self.dir.join(STATE_FILE).exists()
    }

    /// Snapshot `model` and the iteration counter, replacing the previous snapshot.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, iteration: usize) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let ext = <CompactRecorder as FileRecorder<B>>::file_extension();

        let staging = self.dir.join(STAGING_STEM);
        Recorder::<B>::record(&CompactRecorder::new(), model.clone().into_record(), staging)
            .map_err(|e| PipelineError::Learner(format!("cannot record model weights: {e:?}")))?;
        fs::rename(
            self.dir.join(format!("{STAGING_STEM}.{ext}")),
            self.dir.join(format!("{MODEL_STEM}.{ext}")),
        )?;

        let state = serde_json::to_string(&CheckpointState { iteration })
            .map_err(|e| PipelineError::Learner(format!("cannot encode checkpoint state: {e}")))?;
        write_replacing(&self.dir.join(STATE_FILE), &state)?;

        tracing::debug!("Saved checkpoint at iteration {} to '{}'", iteration, self.dir.display());
        Ok(())
    }

    /// Restore weights into `model` and return it with the saved iteration counter.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        device: &B::Device,
    ) -> Result<(M, usize)> {
        let state: CheckpointState = self.read_json(STATE_FILE)?;

        let ext = <CompactRecorder as FileRecorder<B>>::file_extension();
        let weights = self.dir.join(format!("{MODEL_STEM}.{ext}"));
        if !weights.exists() {
            return Err(PipelineError::CheckpointMissing(weights));
        }

        let record: M::Record =
            Recorder::<B>::load(&CompactRecorder::new(), self.dir.join(MODEL_STEM), device)
                .map_err(|e| PipelineError::CheckpointCorrupt {
                    path:   weights.clone(),
                    reason: format!("{e:?}"),
                })?;

        tracing::info!("Loaded checkpoint from iteration {}", state.iteration);
        Ok((model.load_record(record), state.iteration))
    }

    /// Save the run configuration as pretty JSON.
    pub fn save_config<C: Serialize>(&self, cfg: &C) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(cfg)
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        write_replacing(&self.dir.join(CONFIG_FILE), &json)?;
        tracing::debug!("Saved training config to '{}'", self.dir.join(CONFIG_FILE).display());
        Ok(())
    }

    pub fn load_config<C: DeserializeOwned>(&self) -> Result<C> {
        self.read_json(CONFIG_FILE)
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::CheckpointMissing(path));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| PipelineError::CheckpointCorrupt {
            path,
            reason: e.to_string(),
        })
    }
}

/// Write `contents` next to `path` and rename it into place.
fn write_replacing(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
