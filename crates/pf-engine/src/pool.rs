//! Fixed-size parallel execution of one iteration's problem batch.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;
use tracing::warn;

use pf_exec::{ProcessRunner, RunRequest};
use pf_types::{PfError, PfResult, Problem, ProblemFailure, RunRecord};

/// Outcome of one dispatched problem.
#[derive(Debug, Clone, PartialEq)]
pub enum ProblemOutcome {
    Completed(RunRecord),
    Failed(ProblemFailure),
}

/// Dispatches problem batches across a fixed number of worker threads,
/// each running one external process at a time.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    solver_timeout: Option<Duration>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            solver_timeout: None,
        }
    }

    pub fn with_solver_timeout(mut self, timeout: Duration) -> Self {
        self.solver_timeout = Some(timeout);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Execute every problem, blocking until the whole batch is done.
    ///
    /// Outcomes come back in submission order. A failure stays confined to
    /// its own slot; sibling problems always run to completion.
    pub fn execute(
        &self,
        runner: &Arc<dyn ProcessRunner>,
        problems: Vec<Problem>,
    ) -> PfResult<Vec<ProblemOutcome>> {
        let total = problems.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let workers = self.workers.min(total);

        let (job_tx, job_rx) = unbounded::<(usize, Problem)>();
        let (result_tx, result_rx) = unbounded::<(usize, ProblemOutcome)>();

        for job in problems.into_iter().enumerate() {
            job_tx
                .send(job)
                .map_err(|_| PfError::Internal("job channel closed before dispatch".to_string()))?;
        }
        drop(job_tx);

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let runner = Arc::clone(runner);
                let timeout = self.solver_timeout;
                scope.spawn(move || {
                    while let Ok((index, problem)) = job_rx.recv() {
                        let outcome = run_problem(runner.as_ref(), problem, timeout);
                        if result_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut slots: Vec<Option<ProblemOutcome>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);
        for (index, outcome) in result_rx {
            slots[index] = Some(outcome);
        }

        let mut ordered = Vec::with_capacity(total);
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(outcome) => ordered.push(outcome),
                None => {
                    return Err(PfError::Internal(format!(
                        "problem {index} returned no outcome"
                    )));
                }
            }
        }
        Ok(ordered)
    }
}

fn run_problem(
    runner: &dyn ProcessRunner,
    problem: Problem,
    timeout: Option<Duration>,
) -> ProblemOutcome {
    let mut request = RunRequest::new(problem.solver.clone(), problem.params.clone());
    if let Some(timeout) = timeout {
        request = request.with_timeout(timeout);
    }
    match runner.run(&request) {
        Ok(output) => ProblemOutcome::Completed(RunRecord::new(problem, output.stdout, output.stderr)),
        Err(error) => {
            warn!(
                solver = %problem.solver,
                instance = %problem.instance,
                seed = problem.seed,
                %error,
                "problem failed"
            );
            ProblemOutcome::Failed(ProblemFailure::new(&problem, error.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_exec::ScriptedRunner;
    use pf_types::{InstanceCoord, ParamSet};

    fn problems(solvers: &[&str], seeds: &[u64]) -> Vec<Problem> {
        let instance = InstanceCoord::new(10, 100, 1000);
        let base = ParamSet::new();
        let mut out = Vec::new();
        for solver in solvers {
            for &seed in seeds {
                out.push(Problem::new(*solver, instance, seed, &base));
            }
        }
        out
    }

    fn runner_with(stubs: &[(&str, &str)]) -> Arc<dyn ProcessRunner> {
        let mut runner = ScriptedRunner::new();
        for (name, stdout) in stubs {
            runner = runner.stub(*name, *stdout);
        }
        Arc::new(runner)
    }

    #[test]
    fn outcomes_preserve_submission_order() {
        let runner = runner_with(&[("a", "1.0\n"), ("b", "2.0\n")]);
        let pool = WorkerPool::new(4);
        let batch = problems(&["a", "b"], &[100, 200, 300]);
        let expected: Vec<(String, u64)> = batch
            .iter()
            .map(|p| (p.solver.clone(), p.seed))
            .collect();

        let outcomes = pool.execute(&runner, batch).unwrap();
        assert_eq!(outcomes.len(), 6);
        for (outcome, (solver, seed)) in outcomes.iter().zip(&expected) {
            match outcome {
                ProblemOutcome::Completed(record) => {
                    assert_eq!(&record.solver, solver);
                    assert_eq!(record.seed, *seed);
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
    }

    #[test]
    fn failures_stay_in_their_slot() {
        let runner = runner_with(&[("good", "1.0\n")]);
        let pool = WorkerPool::new(2);
        let batch = problems(&["good", "bad", "good"], &[100]);

        let outcomes = pool.execute(&runner, batch).unwrap();
        assert!(matches!(outcomes[0], ProblemOutcome::Completed(_)));
        match &outcomes[1] {
            ProblemOutcome::Failed(failure) => {
                assert_eq!(failure.solver, "bad");
                assert!(failure.error.contains("bad"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(matches!(outcomes[2], ProblemOutcome::Completed(_)));
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let runner = runner_with(&[]);
        let pool = WorkerPool::new(4);
        assert!(pool.execute(&runner, Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn single_worker_runs_in_submission_order() {
        let runner = Arc::new(ScriptedRunner::new().stub("only", "1.0\n"));
        let pool = WorkerPool::new(1);
        let batch = problems(&["only"], &[300, 100, 200]);
        pool.execute(&(Arc::clone(&runner) as Arc<dyn ProcessRunner>), batch)
            .unwrap();

        let seeds: Vec<String> = runner
            .calls()
            .iter()
            .map(|c| c.params.get("seed").map(|v| v.to_string()).unwrap_or_default())
            .collect();
        assert_eq!(seeds, vec!["300", "100", "200"]);
    }
}
