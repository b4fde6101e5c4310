//! Error statistics between solver and reference outputs.

use std::collections::HashMap;

use pf_types::{InstanceCoord, MetricError, PfResult, RunRecord};

/// All records for one (solver, instance) group, ordered by seed.
pub fn subset<'a>(
    records: &'a [RunRecord],
    solver: &str,
    instance: InstanceCoord,
) -> Vec<&'a RunRecord> {
    let mut group: Vec<&RunRecord> = records
        .iter()
        .filter(|r| r.solver == solver && r.instance == instance)
        .collect();
    group.sort_by_key(|r| r.seed);
    group
}

/// Squared error between two vectors, normalized by the squared norm of
/// the reference `x0`. Elementwise terms pair up to the shorter length.
pub fn nmse(x: &[f64], x0: &[f64]) -> f64 {
    let ss: f64 = x.iter().zip(x0).map(|(a, b)| (a - b) * (a - b)).sum();
    let ss0: f64 = x0.iter().map(|b| b * b).sum();
    ss / ss0
}

/// Mean and population variance of a sample. Empty input has neither.
pub fn mean_variance(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    Some((mean, variance))
}

/// Per-seed nmse statistics for one solver group against the reference
/// group at the same instance.
///
/// Runs pair up by seed; seeds without a counterpart on the other side are
/// skipped. Each pair compares the first stdout column of the two runs, so
/// a paired run with no output rows is an error rather than a zero score.
/// A reference with zero norm cannot be compared, and a group with no
/// pairs at all yields no statistics; both are errors.
pub fn paired_metric(
    solver: &str,
    instance: InstanceCoord,
    group: &[&RunRecord],
    reference: &[&RunRecord],
) -> PfResult<(f64, f64)> {
    let by_seed: HashMap<u64, &RunRecord> = reference.iter().map(|r| (r.seed, *r)).collect();

    let mut errors = Vec::with_capacity(group.len());
    for record in group {
        if let Some(oracle) = by_seed.get(&record.seed) {
            let x = pf_exec::column(&record.stdout, 0);
            let x0 = pf_exec::column(&oracle.stdout, 0);
            if x.is_empty() || x0.is_empty() {
                let empty = if x.is_empty() { record } else { oracle };
                return Err(MetricError::EmptyMeasurement {
                    solver: empty.solver.clone(),
                    seed: record.seed,
                }
                .into());
            }
            if x0.iter().map(|v| v * v).sum::<f64>() == 0.0 {
                return Err(MetricError::ZeroNormReference {
                    solver: solver.to_string(),
                    instance,
                }
                .into());
            }
            errors.push(nmse(&x, &x0));
        }
    }

    match mean_variance(&errors) {
        Some(stats) => Ok(stats),
        None => Err(MetricError::EmptyGroup {
            solver: solver.to_string(),
            instance,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_types::{ParamSet, PfError, Problem, Table};

    fn record(solver: &str, instance: InstanceCoord, seed: u64, first_column: &[f64]) -> RunRecord {
        let stdout: Table = first_column.iter().map(|v| vec![*v, 99.0]).collect();
        let problem = Problem::new(solver, instance, seed, &ParamSet::new());
        RunRecord::new(problem, stdout, Vec::new())
    }

    fn inst() -> InstanceCoord {
        InstanceCoord::new(10, 100, 1000)
    }

    #[test]
    fn nmse_of_identical_vectors_is_zero() {
        assert_eq!(nmse(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn nmse_known_value() {
        // ((1-2)^2 + (2-2)^2) / (2^2 + 2^2)
        assert_eq!(nmse(&[1.0, 2.0], &[2.0, 2.0]), 0.125);
    }

    #[test]
    fn nmse_is_scale_invariant() {
        let x = [1.0, 2.0, 4.0];
        let x0 = [1.5, 2.5, 3.5];
        let scaled: Vec<f64> = x.iter().map(|v| v * 2.0).collect();
        let scaled0: Vec<f64> = x0.iter().map(|v| v * 2.0).collect();
        assert!((nmse(&x, &x0) - nmse(&scaled, &scaled0)).abs() < 1e-12);
    }

    #[test]
    fn mean_variance_is_population_variance() {
        let (mean, variance) = mean_variance(&[1.0, 3.0]).unwrap();
        assert_eq!(mean, 2.0);
        assert_eq!(variance, 1.0);

        let (mean, variance) = mean_variance(&[0.5]).unwrap();
        assert_eq!(mean, 0.5);
        assert_eq!(variance, 0.0);

        assert!(mean_variance(&[]).is_none());
    }

    #[test]
    fn subset_filters_and_sorts_by_seed() {
        let other = InstanceCoord::new(5, 50, 1000);
        let records = vec![
            record("vrls", inst(), 300, &[1.0]),
            record("vrls", other, 100, &[1.0]),
            record("oracle", inst(), 100, &[1.0]),
            record("vrls", inst(), 100, &[1.0]),
            record("vrls", inst(), 200, &[1.0]),
        ];
        let group = subset(&records, "vrls", inst());
        let seeds: Vec<u64> = group.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![100, 200, 300]);
    }

    #[test]
    fn paired_metric_on_identical_outputs_is_zero() {
        let records = vec![
            record("oracle", inst(), 100, &[1.0, 2.0]),
            record("oracle", inst(), 200, &[3.0, 4.0]),
            record("vrls", inst(), 100, &[1.0, 2.0]),
            record("vrls", inst(), 200, &[3.0, 4.0]),
        ];
        let group = subset(&records, "vrls", inst());
        let reference = subset(&records, "oracle", inst());
        let (mean, variance) = paired_metric("vrls", inst(), &group, &reference).unwrap();
        assert_eq!(mean, 0.0);
        assert_eq!(variance, 0.0);
    }

    #[test]
    fn paired_metric_averages_per_seed_errors() {
        let records = vec![
            record("oracle", inst(), 100, &[2.0, 2.0]),
            record("oracle", inst(), 200, &[2.0, 2.0]),
            record("vrls", inst(), 100, &[1.0, 2.0]),
            record("vrls", inst(), 200, &[3.0, 2.0]),
        ];
        let group = subset(&records, "vrls", inst());
        let reference = subset(&records, "oracle", inst());
        let (mean, variance) = paired_metric("vrls", inst(), &group, &reference).unwrap();
        // Both seeds err by 0.125, so the spread is zero.
        assert_eq!(mean, 0.125);
        assert_eq!(variance, 0.0);
    }

    #[test]
    fn unpaired_seeds_are_skipped() {
        let records = vec![
            record("oracle", inst(), 100, &[1.0]),
            record("vrls", inst(), 100, &[1.0]),
            record("vrls", inst(), 200, &[5.0]),
        ];
        let group = subset(&records, "vrls", inst());
        let reference = subset(&records, "oracle", inst());
        let (mean, variance) = paired_metric("vrls", inst(), &group, &reference).unwrap();
        assert_eq!(mean, 0.0);
        assert_eq!(variance, 0.0);
    }

    #[test]
    fn no_pairs_is_an_empty_group() {
        let records = vec![record("vrls", inst(), 100, &[1.0])];
        let group = subset(&records, "vrls", inst());
        let reference = subset(&records, "oracle", inst());
        let err = paired_metric("vrls", inst(), &group, &reference).unwrap_err();
        assert!(matches!(
            err,
            PfError::Metric(MetricError::EmptyGroup { .. })
        ));
    }

    #[test]
    fn zero_norm_reference_is_rejected() {
        let records = vec![
            record("oracle", inst(), 100, &[0.0, 0.0]),
            record("vrls", inst(), 100, &[1.0]),
        ];
        let group = subset(&records, "vrls", inst());
        let reference = subset(&records, "oracle", inst());
        let err = paired_metric("vrls", inst(), &group, &reference).unwrap_err();
        assert!(matches!(
            err,
            PfError::Metric(MetricError::ZeroNormReference { .. })
        ));
    }

    #[test]
    fn empty_solver_output_cannot_be_scored() {
        // A run with no parsed rows must not pass for perfect agreement.
        let records = vec![
            record("oracle", inst(), 100, &[1.0, 2.0]),
            record("vrls", inst(), 100, &[]),
        ];
        let group = subset(&records, "vrls", inst());
        let reference = subset(&records, "oracle", inst());
        let err = paired_metric("vrls", inst(), &group, &reference).unwrap_err();
        match err {
            PfError::Metric(MetricError::EmptyMeasurement { solver, seed }) => {
                assert_eq!(solver, "vrls");
                assert_eq!(seed, 100);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_reference_output_cannot_be_scored() {
        let records = vec![
            record("oracle", inst(), 100, &[]),
            record("vrls", inst(), 100, &[1.0, 2.0]),
        ];
        let group = subset(&records, "vrls", inst());
        let reference = subset(&records, "oracle", inst());
        let err = paired_metric("vrls", inst(), &group, &reference).unwrap_err();
        assert!(matches!(
            err,
            PfError::Metric(MetricError::EmptyMeasurement { ref solver, .. }) if solver == "oracle"
        ));
    }
}
