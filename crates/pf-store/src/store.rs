//! On-disk layout of one experiment directory.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use pf_types::{Observation, PfResult, StoreError};

use crate::checkpoint::Checkpoint;

/// Manages the archives of one experiment directory (one noise level):
/// numbered iteration checkpoints plus per-solver observation files.
#[derive(Debug, Clone)]
pub struct SampleStore {
    root: PathBuf,
}

impl SampleStore {
    /// Open an experiment directory, creating it if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> PfResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn checkpoint_path(&self, iteration: usize) -> PathBuf {
        self.root.join(format!("{iteration}.gz"))
    }

    pub fn observations_path(&self, solver: &str) -> PathBuf {
        self.root.join(format!("{solver}.gz"))
    }

    /// Persist one iteration's results. Checkpoints are append-only;
    /// writing over an existing iteration file is refused.
    pub fn write_checkpoint(&self, checkpoint: &Checkpoint) -> PfResult<PathBuf> {
        let path = self.checkpoint_path(checkpoint.iteration);
        if path.exists() {
            return Err(StoreError::CheckpointExists {
                path: path.display().to_string(),
            }
            .into());
        }
        let tmp = self.root.join(format!("{}.gz.tmp", checkpoint.iteration));
        write_gz(&tmp, checkpoint)?;
        fs::rename(&tmp, &path)?;
        debug!(
            iteration = checkpoint.iteration,
            records = checkpoint.records.len(),
            failures = checkpoint.failures.len(),
            path = %path.display(),
            "checkpoint written"
        );
        Ok(path)
    }

    pub fn load_checkpoint(&self, iteration: usize) -> PfResult<Checkpoint> {
        read_gz(&self.checkpoint_path(iteration))
    }

    /// Iteration numbers with a checkpoint on disk, ascending.
    pub fn list_checkpoints(&self) -> PfResult<Vec<usize>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            if let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".gz")) {
                if let Ok(iteration) = stem.parse::<usize>() {
                    found.push(iteration);
                }
            }
        }
        found.sort_unstable();
        Ok(found)
    }

    /// Write a solver's full observation history. Unlike checkpoints these
    /// are rewritten whole on each call.
    pub fn write_observations(
        &self,
        solver: &str,
        observations: &[Observation],
    ) -> PfResult<PathBuf> {
        let path = self.observations_path(solver);
        let tmp = self.root.join(format!("{solver}.gz.tmp"));
        write_gz(&tmp, &observations)?;
        fs::rename(&tmp, &path)?;
        debug!(solver, count = observations.len(), "observations written");
        Ok(path)
    }

    pub fn load_observations(&self, solver: &str) -> PfResult<Vec<Observation>> {
        read_gz(&self.observations_path(solver))
    }
}

fn write_gz<T: serde::Serialize>(path: &Path, value: &T) -> PfResult<()> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, value)?;
    encoder.finish()?;
    Ok(())
}

fn read_gz<T: serde::de::DeserializeOwned>(path: &Path) -> PfResult<T> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    serde_json::from_reader(decoder).map_err(|e| {
        StoreError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
