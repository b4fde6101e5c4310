//! Surrogate lifecycle and proposal management.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pf_exec::{ProcessRunner, RunRequest};
use pf_types::{
    InstanceCoord, ModelError, Observation, ParamSet, PfResult, PhaseCoord, SurrogateConfig,
};

/// Lifecycle of a [`SurrogateModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurrogateState {
    /// No proposals drawn yet; the initializer has not run.
    Uninitialized,
    /// Proposal queue consistent with the history.
    Prepared,
    /// A conditioning call is due or has failed; entered when the queue
    /// drains, left once fresh candidates arrive.
    Replenishing,
}

/// Adaptive sampler for one solver's phase diagram.
///
/// Proposals are raw phase coordinates produced by the external programs.
/// Handed-out coordinates stay on an outstanding list until the matching
/// instance is observed, and conditioning requests are padded so a single
/// call can survive collisions with them.
pub struct SurrogateModel {
    solver: String,
    config: SurrogateConfig,
    runner: Arc<dyn ProcessRunner>,
    state: SurrogateState,
    queue: VecDeque<PhaseCoord>,
    outstanding: Vec<PhaseCoord>,
    history: Vec<Observation>,
}

impl SurrogateModel {
    pub fn new(
        solver: impl Into<String>,
        config: SurrogateConfig,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            solver: solver.into(),
            config,
            runner,
            state: SurrogateState::Uninitialized,
            queue: VecDeque::new(),
            outstanding: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn solver(&self) -> &str {
        &self.solver
    }

    pub fn state(&self) -> SurrogateState {
        self.state
    }

    /// Coordinates queued but not yet handed out.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Every observation recorded so far, in arrival order.
    pub fn observations(&self) -> &[Observation] {
        &self.history
    }

    /// Next phase coordinate to measure.
    ///
    /// Runs the initializer on first use; once the queue drains, conditions
    /// on the full history for fresh candidates. Queued coordinates are
    /// handed out oldest first.
    pub fn next_proposal(&mut self) -> PfResult<PhaseCoord> {
        if self.state == SurrogateState::Uninitialized {
            self.initialize()?;
        }
        if self.queue.is_empty() {
            self.replenish()?;
        }
        match self.queue.pop_front() {
            Some(point) => {
                self.outstanding.push(point);
                Ok(point)
            }
            // Reachable when the initializer emitted nothing at all.
            None => Err(ModelError::NoFreshProposals {
                solver: self.solver.clone(),
            }
            .into()),
        }
    }

    /// Record measured error statistics for an instance.
    ///
    /// The instance maps back to its exact phase position (m/n, k/m), which
    /// is what enters the history; any outstanding proposal that maps to
    /// the same instance is retired.
    pub fn observe(&mut self, instance: InstanceCoord, mean: f64, variance: f64) -> PfResult<()> {
        let phase = instance.to_phase()?;
        if let Some(index) = self
            .outstanding
            .iter()
            .position(|p| p.to_instance(instance.n) == instance)
        {
            self.outstanding.swap_remove(index);
        }
        self.history.push(Observation::new(phase, mean, variance));
        Ok(())
    }

    fn initialize(&mut self) -> PfResult<()> {
        let mut params = ParamSet::new();
        params.set("num", self.config.init_num);
        params.set("grid", self.config.grid);
        params.set("seed", self.config.seed);
        let request = RunRequest::new(self.config.gp_init.clone(), params);
        let output = self.runner.run(&request)?;

        // Every emitted row is a candidate; the initializer is free to
        // print more rows than asked for.
        for row in &output.stdout {
            if let [delta, rho, ..] = row[..] {
                self.push_candidate(PhaseCoord::new(delta, rho));
            }
        }
        self.state = SurrogateState::Prepared;
        info!(
            solver = %self.solver,
            candidates = self.queue.len(),
            "surrogate initialized"
        );
        Ok(())
    }

    fn replenish(&mut self) -> PfResult<()> {
        if self.history.is_empty() {
            return Err(ModelError::InvalidState {
                message: format!("{}: conditioning requested with no observations", self.solver),
            }
            .into());
        }
        self.state = SurrogateState::Replenishing;

        // Pad the request so one call survives collisions with coordinates
        // that are already out for measurement.
        let num = self.config.batch_num + self.outstanding.len();
        let mut params = ParamSet::new();
        params.set("num", num);
        params.set("threads", self.config.threads);
        params.set("grid", self.config.grid);
        params.set("exploit", self.config.exploit);
        let request = RunRequest::new(self.config.gp_next.clone(), params)
            .with_stdin(self.history_rows());
        let output = self.runner.run(&request)?;

        let mut appended = 0;
        for row in &output.stdout {
            if appended == self.config.batch_num {
                break;
            }
            if let [delta, rho, ..] = row[..] {
                if self.push_candidate(PhaseCoord::new(delta, rho)) {
                    appended += 1;
                }
            }
        }
        if appended == 0 {
            return Err(ModelError::NoFreshProposals {
                solver: self.solver.clone(),
            }
            .into());
        }
        self.state = SurrogateState::Prepared;
        debug!(solver = %self.solver, appended, "surrogate replenished");
        Ok(())
    }

    /// History in the conditioning program's input format, one
    /// `delta rho mean variance` row per observation.
    fn history_rows(&self) -> String {
        let mut text = String::new();
        for obs in &self.history {
            text.push_str(&format!(
                "{} {} {} {}\n",
                obs.delta, obs.rho, obs.mean, obs.variance
            ));
        }
        text
    }

    fn push_candidate(&mut self, point: PhaseCoord) -> bool {
        let known = self.queue.iter().any(|q| q.same_point(&point))
            || self.outstanding.iter().any(|o| o.same_point(&point));
        if known {
            return false;
        }
        self.queue.push_back(point);
        true
    }
}
