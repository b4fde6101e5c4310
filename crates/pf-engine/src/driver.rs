//! Experiment orchestration: the propose, execute, measure, observe loop.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pf_exec::ProcessRunner;
use pf_store::{Checkpoint, SampleStore};
use pf_surrogate::SurrogateModel;
use pf_types::{
    internal_error, ExperimentConfig, InstanceCoord, PfResult, Problem, ProblemFailure, RunId,
};

use crate::metrics::{paired_metric, subset};
use crate::pool::{ProblemOutcome, WorkerPool};
use crate::seeds::derive_seeds;

/// Lifecycle state of an experiment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperimentState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Aggregate progress of an experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentStatus {
    pub id: RunId,
    pub state: ExperimentState,
    pub iterations_completed: usize,
    pub problems_executed: usize,
    pub problems_failed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ExperimentStatus {
    pub fn new(id: RunId) -> Self {
        Self {
            id,
            state: ExperimentState::Pending,
            iterations_completed: 0,
            problems_executed: 0,
            problems_failed: 0,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = ExperimentState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.state = ExperimentState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = ExperimentState::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }
}

/// Final account of a run: what executed, what failed, what was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub id: RunId,
    pub name: String,
    pub stdev: f64,
    pub iterations: usize,
    pub problems_executed: usize,
    pub failures: Vec<ProblemFailure>,
    pub checkpoints: Vec<PathBuf>,
    pub observation_files: Vec<PathBuf>,
}

struct IterationOutcome {
    checkpoint: PathBuf,
    failures: Vec<ProblemFailure>,
}

/// Coordinates one experiment run at one noise level.
///
/// Each iteration draws a proposal from every solver's surrogate, runs the
/// full roster over the de-duplicated proposals and the whole seed set,
/// checkpoints the raw results, and only then feeds the per-solver error
/// statistics back into the surrogates.
pub struct ExperimentDriver {
    config: ExperimentConfig,
    runner: Arc<dyn ProcessRunner>,
    store: SampleStore,
    pool: WorkerPool,
    models: BTreeMap<String, SurrogateModel>,
    seeds: Vec<u64>,
    status: ExperimentStatus,
}

impl ExperimentDriver {
    /// Validate the configuration and set up models, store, and pool.
    pub fn new(config: ExperimentConfig, runner: Arc<dyn ProcessRunner>) -> PfResult<Self> {
        config.validate()?;
        let store = SampleStore::new(&config.out_dir)?;
        let seeds = derive_seeds(config.master_seed, config.seed_count)?;
        let mut pool = WorkerPool::new(config.workers);
        if let Some(secs) = config.solver_timeout_secs {
            pool = pool.with_solver_timeout(Duration::from_secs(secs));
        }
        let models = config
            .solvers
            .iter()
            .map(|solver| {
                let model = SurrogateModel::new(
                    solver.clone(),
                    config.surrogate.clone(),
                    Arc::clone(&runner),
                );
                (solver.clone(), model)
            })
            .collect();
        Ok(Self {
            status: ExperimentStatus::new(config.id),
            config,
            runner,
            store,
            pool,
            models,
            seeds,
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn status(&self) -> &ExperimentStatus {
        &self.status
    }

    /// One solver's surrogate, mostly for inspection after a run.
    pub fn model(&self, solver: &str) -> Option<&SurrogateModel> {
        self.models.get(solver)
    }

    /// Run every iteration, then write the per-solver observation archives.
    pub fn run(&mut self) -> PfResult<RunReport> {
        self.status.mark_running();
        info!(
            run = %self.config.id,
            name = %self.config.name,
            stdev = self.config.noise.stdev,
            iterations = self.config.iterations,
            seeds = self.seeds.len(),
            "experiment started"
        );
        match self.run_to_completion() {
            Ok(report) => {
                self.status.mark_completed();
                info!(
                    run = %self.config.id,
                    problems = report.problems_executed,
                    failed = report.failures.len(),
                    "experiment completed"
                );
                Ok(report)
            }
            Err(error) => {
                self.status.mark_failed(error.to_string());
                Err(error)
            }
        }
    }

    fn run_to_completion(&mut self) -> PfResult<RunReport> {
        let mut failures = Vec::new();
        let mut checkpoints = Vec::new();
        for iteration in 0..self.config.iterations {
            let outcome = self.run_iteration(iteration)?;
            checkpoints.push(outcome.checkpoint);
            failures.extend(outcome.failures);
            self.status.iterations_completed += 1;
        }

        let mut observation_files = Vec::new();
        for (solver, model) in &self.models {
            let path = self.store.write_observations(solver, model.observations())?;
            observation_files.push(path);
        }

        Ok(RunReport {
            id: self.config.id,
            name: self.config.name.clone(),
            stdev: self.config.noise.stdev,
            iterations: self.status.iterations_completed,
            problems_executed: self.status.problems_executed,
            failures,
            checkpoints,
            observation_files,
        })
    }

    fn run_iteration(&mut self, iteration: usize) -> PfResult<IterationOutcome> {
        // One fresh coordinate per solver under study. Proposals that land
        // on the same instance collapse, so paired comparisons share the
        // exact same problems.
        let mut proposals = BTreeSet::new();
        for model in self.models.values_mut() {
            let phase = model.next_proposal()?;
            proposals.insert(phase.to_instance(self.config.ambient_n));
        }

        let problems = self.build_problems(&proposals);
        info!(
            iteration,
            proposals = proposals.len(),
            problems = problems.len(),
            "iteration dispatched"
        );

        let outcomes = self.pool.execute(&self.runner, problems)?;
        let mut records = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                ProblemOutcome::Completed(record) => records.push(record),
                ProblemOutcome::Failed(failure) => failures.push(failure),
            }
        }
        self.status.problems_executed += records.len();
        self.status.problems_failed += failures.len();
        if !failures.is_empty() {
            warn!(iteration, failed = failures.len(), "iteration had failed problems");
        }

        // Raw results hit disk before any surrogate update.
        let checkpoint = Checkpoint::new(iteration, records, failures);
        let path = self.store.write_checkpoint(&checkpoint)?;

        // All metrics are computed before any model sees one, so a fatal
        // metric error cannot leave the surrogates half-updated.
        let mut updates = Vec::new();
        for instance in &proposals {
            let reference = subset(&checkpoint.records, &self.config.oracle, *instance);
            for solver in &self.config.solvers {
                let group = subset(&checkpoint.records, solver, *instance);
                let (mean, variance) = paired_metric(solver, *instance, &group, &reference)?;
                debug!(iteration, solver = %solver, instance = %instance, mean, variance, "metric");
                updates.push((solver.clone(), *instance, mean, variance));
            }
        }
        for (solver, instance, mean, variance) in updates {
            match self.models.get_mut(&solver) {
                Some(model) => model.observe(instance, mean, variance)?,
                None => return Err(internal_error!("no surrogate for {solver}")),
            }
        }

        Ok(IterationOutcome {
            checkpoint: path,
            failures: checkpoint.failures,
        })
    }

    fn build_problems(&self, proposals: &BTreeSet<InstanceCoord>) -> Vec<Problem> {
        let base = self.config.noise.base_params();
        let roster = self.config.roster();
        let mut problems = Vec::with_capacity(roster.len() * proposals.len() * self.seeds.len());
        for solver in &roster {
            for instance in proposals {
                for &seed in &self.seeds {
                    problems.push(Problem::new(solver.clone(), *instance, seed, &base));
                }
            }
        }
        problems
    }
}
