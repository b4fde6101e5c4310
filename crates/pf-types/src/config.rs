use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::DEFAULT_AMBIENT_DIM;
use crate::errors::{PfError, PfResult};
use crate::params::ParamSet;

/// Unique identifier for one experiment run.
pub type RunId = Uuid;

/// Precision substituted when the noise standard deviation is zero, so
/// noiseless runs keep finite parameters.
pub const ZERO_NOISE_PRECISION: f64 = 1e9;

/// Measurement-noise model for an experiment: the standard deviation and
/// the precision parameters derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseModel {
    pub stdev: f64,
    pub precision: f64,
}

impl NoiseModel {
    /// Derive the precision `1 / stdev^2`, falling back to
    /// [`ZERO_NOISE_PRECISION`] at zero.
    pub fn from_stdev(stdev: f64) -> Self {
        let precision = if stdev > 0.0 {
            1.0 / (stdev * stdev)
        } else {
            ZERO_NOISE_PRECISION
        };
        Self { stdev, precision }
    }

    /// Base solver parameters shared by every problem at this noise level.
    pub fn base_params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        params.set("stdev", self.stdev);
        params.set("tau", self.precision);
        params.set("xi", self.precision);
        params.set("beta_tau", self.precision);
        params.set("beta_xi", self.precision);
        params
    }

    /// Directory name for this noise level, e.g. "0" or "0.001".
    pub fn dir_name(&self) -> String {
        format!("{}", self.stdev)
    }
}

/// Tuning for the per-solver surrogate models and the external
/// Gaussian-process programs behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateConfig {
    /// Candidate count requested from the initializer.
    pub init_num: usize,
    /// Candidates requested per replenishment.
    pub batch_num: usize,
    /// Grid resolution per phase-plane axis.
    pub grid: u32,
    /// Seed for the initializer. Zero would let it draw its own.
    pub seed: u64,
    /// Worker threads for the conditioning program.
    pub threads: usize,
    /// Prefer points near the phase transition over pure exploration.
    pub exploit: bool,
    /// Initializer executable name.
    pub gp_init: String,
    /// Conditioning executable name.
    pub gp_next: String,
}

impl Default for SurrogateConfig {
    fn default() -> Self {
        Self {
            init_num: 10,
            batch_num: 1,
            grid: 100,
            seed: 1,
            threads: 4,
            exploit: false,
            gp_init: "gp-init".to_string(),
            gp_next: "gp-next".to_string(),
        }
    }
}

/// Top-level configuration for one experiment run at one noise level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub id: RunId,
    pub name: String,

    /// Solvers under study, each compared against the oracle.
    pub solvers: Vec<String>,
    /// Reference solver whose output defines ground truth.
    pub oracle: String,

    /// Directory holding the solver and Gaussian-process executables.
    pub bin_dir: PathBuf,
    /// Directory receiving checkpoints and observation archives.
    pub out_dir: PathBuf,

    pub noise: NoiseModel,
    pub surrogate: SurrogateConfig,

    /// Number of sampling iterations.
    pub iterations: usize,
    /// Distinct noise seeds crossed with every proposal.
    pub seed_count: usize,
    /// Master seed the noise seeds are derived from.
    pub master_seed: u64,

    /// Ambient dimension used when mapping proposals to instances.
    pub ambient_n: u32,
    /// Worker-pool size for solver execution.
    pub workers: usize,
    /// Optional wall-clock budget per solver invocation, in seconds.
    pub solver_timeout_secs: Option<u64>,

    pub created_at: DateTime<Utc>,
}

impl ExperimentConfig {
    pub fn new(name: impl Into<String>, solvers: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            solvers,
            oracle: "oracle".to_string(),
            bin_dir: PathBuf::from("bin"),
            out_dir: PathBuf::from("expts/samples/0"),
            noise: NoiseModel::from_stdev(0.0),
            surrogate: SurrogateConfig::default(),
            iterations: 100,
            seed_count: 100,
            master_seed: 1729,
            ambient_n: DEFAULT_AMBIENT_DIM,
            workers: default_workers(),
            solver_timeout_secs: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_oracle(mut self, oracle: impl Into<String>) -> Self {
        self.oracle = oracle.into();
        self
    }

    pub fn with_bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = dir.into();
        self
    }

    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    pub fn with_noise(mut self, noise: NoiseModel) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_surrogate(mut self, surrogate: SurrogateConfig) -> Self {
        self.surrogate = surrogate;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_seeds(mut self, seed_count: usize, master_seed: u64) -> Self {
        self.seed_count = seed_count;
        self.master_seed = master_seed;
        self
    }

    pub fn with_ambient_dim(mut self, n: u32) -> Self {
        self.ambient_n = n;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_solver_timeout(mut self, secs: u64) -> Self {
        self.solver_timeout_secs = Some(secs);
        self
    }

    /// Full roster executed each iteration: the oracle first, then the
    /// solvers under study.
    pub fn roster(&self) -> Vec<String> {
        let mut roster = Vec::with_capacity(self.solvers.len() + 1);
        roster.push(self.oracle.clone());
        roster.extend(self.solvers.iter().cloned());
        roster
    }

    pub fn validate(&self) -> PfResult<()> {
        if self.solvers.is_empty() {
            return Err(PfError::Config("no solvers under study".to_string()));
        }
        if self.oracle.is_empty() {
            return Err(PfError::Config("oracle solver name is empty".to_string()));
        }
        if self.solvers.contains(&self.oracle) {
            return Err(PfError::Config(format!(
                "oracle {:?} cannot also be under study",
                self.oracle
            )));
        }
        // A duplicate would run twice per proposal and overwrite its own
        // observation archive.
        for (index, solver) in self.solvers.iter().enumerate() {
            if self.solvers[..index].contains(solver) {
                return Err(PfError::Config(format!(
                    "solver {:?} is listed more than once",
                    solver
                )));
            }
        }
        if self.iterations == 0 {
            return Err(PfError::Config("iterations must be positive".to_string()));
        }
        if self.seed_count == 0 {
            return Err(PfError::Config("seed count must be positive".to_string()));
        }
        if self.ambient_n == 0 {
            return Err(PfError::Config(
                "ambient dimension must be positive".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(PfError::Config("worker count must be positive".to_string()));
        }
        if !(self.noise.stdev >= 0.0) {
            return Err(PfError::Config(format!(
                "noise stdev must be non-negative, got {}",
                self.noise.stdev
            )));
        }
        if self.surrogate.init_num == 0 || self.surrogate.batch_num == 0 {
            return Err(PfError::Config(
                "surrogate candidate counts must be positive".to_string(),
            ));
        }
        if self.surrogate.seed == 0 {
            return Err(PfError::Config(
                "surrogate seed must be nonzero for a reproducible initializer".to_string(),
            ));
        }
        if self.surrogate.grid < 2 {
            return Err(PfError::Config(
                "surrogate grid must have at least 2 cells per axis".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
