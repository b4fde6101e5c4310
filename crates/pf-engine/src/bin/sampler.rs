// Phase-diagram sampling service
//
// Sweeps the configured noise levels, running one adaptive sampling
// experiment per level against the solver executables in the binary
// directory. Configuration comes from PHASEFRONT_* environment variables;
// unset variables fall back to the stock experiment layout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pf_engine::ExperimentDriver;
use pf_exec::{ProcessRunner, SubprocessRunner};
use pf_types::{ExperimentConfig, NoiseModel, SurrogateConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bin_dir = env_or("PHASEFRONT_BIN_DIR", "bin");
    let out_root = PathBuf::from(env_or("PHASEFRONT_OUT_DIR", "expts/samples"));
    let solvers = split_list(&env_or("PHASEFRONT_SOLVERS", "irls-ec,irls-em,vrls,vrls-ex"));
    let levels = parse_levels(&env_or("PHASEFRONT_STDEV", "0,0.001,0.01,0.1"))?;
    let iterations: usize = parse_env("PHASEFRONT_ITERATIONS", 100)?;
    let seed_count: usize = parse_env("PHASEFRONT_SEEDS", 100)?;
    let master_seed: u64 = parse_env("PHASEFRONT_MASTER_SEED", 1729)?;
    let workers: Option<usize> = parse_env_opt("PHASEFRONT_WORKERS")?;
    let timeout_secs: Option<u64> = parse_env_opt("PHASEFRONT_TIMEOUT_SECS")?;

    let mut surrogate = SurrogateConfig::default();
    surrogate.exploit = parse_env("PHASEFRONT_EXPLOIT", false)?;
    surrogate.seed = parse_env("PHASEFRONT_GP_SEED", surrogate.seed)?;

    let runner = Arc::new(SubprocessRunner::new(&bin_dir));
    info!(bin_dir = %bin_dir, out_root = %out_root.display(), levels = levels.len(), "sampler starting");

    let mut total_failures = 0usize;
    for stdev in levels {
        let noise = NoiseModel::from_stdev(stdev);
        let mut config = ExperimentConfig::new(format!("samples-{}", noise.dir_name()), solvers.clone())
            .with_noise(noise)
            .with_bin_dir(bin_dir.as_str())
            .with_out_dir(out_root.join(noise.dir_name()))
            .with_iterations(iterations)
            .with_seeds(seed_count, master_seed)
            .with_surrogate(surrogate.clone());
        if let Some(workers) = workers {
            config = config.with_workers(workers);
        }
        if let Some(secs) = timeout_secs {
            config = config.with_solver_timeout(secs);
        }

        let mut driver =
            ExperimentDriver::new(config, Arc::clone(&runner) as Arc<dyn ProcessRunner>)?;
        let report = driver
            .run()
            .with_context(|| format!("sampling failed at noise level {stdev}"))?;

        for failure in &report.failures {
            warn!(
                solver = %failure.solver,
                instance = %failure.instance,
                seed = failure.seed,
                error = %failure.error,
                "failed problem"
            );
        }
        total_failures += report.failures.len();
        info!(
            stdev,
            problems = report.problems_executed,
            failures = report.failures.len(),
            checkpoints = report.checkpoints.len(),
            "noise level finished"
        );
    }

    if total_failures > 0 {
        bail!("{total_failures} problems failed; see the logs and checkpoints");
    }
    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_levels(raw: &str) -> anyhow::Result<Vec<f64>> {
    let levels = split_list(raw);
    if levels.is_empty() {
        bail!("PHASEFRONT_STDEV lists no noise levels");
    }
    levels
        .iter()
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("bad noise level {s:?}"))
        })
        .collect()
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("bad value for {key}")),
        Err(_) => Ok(default),
    }
}

fn parse_env_opt<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("bad value for {key}")),
        Err(_) => Ok(None),
    }
}
