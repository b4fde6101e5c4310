use serde::{Deserialize, Serialize};

use crate::coords::{InstanceCoord, PhaseCoord};
use crate::params::ParamSet;

/// Parsed numeric output of one process stream, one row per non-blank line.
pub type Table = Vec<Vec<f64>>;

/// One unit of solver work: which solver, which instance, which noise seed,
/// plus the full parameter mapping handed to the executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub solver: String,
    pub instance: InstanceCoord,
    pub seed: u64,
    pub params: ParamSet,
}

impl Problem {
    /// Build a problem from shared base parameters, adding the instance
    /// dimensions and seed on top.
    pub fn new(solver: impl Into<String>, instance: InstanceCoord, seed: u64, base: &ParamSet) -> Self {
        let mut params = base.clone();
        params.set("k", instance.k);
        params.set("m", instance.m);
        params.set("n", instance.n);
        params.set("seed", seed);
        Self {
            solver: solver.into(),
            instance,
            seed,
            params,
        }
    }
}

/// Raw result of one executed problem, as captured in iteration checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub solver: String,
    pub instance: InstanceCoord,
    pub seed: u64,
    pub params: ParamSet,
    pub stdout: Table,
    pub stderr: Table,
}

impl RunRecord {
    pub fn new(problem: Problem, stdout: Table, stderr: Table) -> Self {
        Self {
            solver: problem.solver,
            instance: problem.instance,
            seed: problem.seed,
            params: problem.params,
            stdout,
            stderr,
        }
    }
}

/// A problem that produced no usable result, with the cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemFailure {
    pub solver: String,
    pub instance: InstanceCoord,
    pub seed: u64,
    pub error: String,
}

impl ProblemFailure {
    pub fn new(problem: &Problem, error: impl Into<String>) -> Self {
        Self {
            solver: problem.solver.clone(),
            instance: problem.instance,
            seed: problem.seed,
            error: error.into(),
        }
    }
}

/// One measured point of a solver's phase diagram: the phase coordinates
/// and the error statistics recorded there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub delta: f64,
    pub rho: f64,
    pub mean: f64,
    pub variance: f64,
}

impl Observation {
    pub fn new(phase: PhaseCoord, mean: f64, variance: f64) -> Self {
        Self {
            delta: phase.delta,
            rho: phase.rho,
            mean,
            variance,
        }
    }

    pub fn phase(&self) -> PhaseCoord {
        PhaseCoord::new(self.delta, self.rho)
    }
}
