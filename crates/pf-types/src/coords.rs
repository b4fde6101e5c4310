use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{PfError, PfResult};

/// Ambient dimension `n` shared by every instance in an experiment unless
/// configured otherwise.
pub const DEFAULT_AMBIENT_DIM: u32 = 1000;

/// Raw dimensions of a single problem instance: sparsity `k`, measurement
/// count `m`, and ambient dimension `n`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct InstanceCoord {
    pub k: u32,
    pub m: u32,
    pub n: u32,
}

impl InstanceCoord {
    pub fn new(k: u32, m: u32, n: u32) -> Self {
        Self { k, m, n }
    }

    /// Position of this instance in the normalized phase plane:
    /// undersampling `delta = m/n` and sparsity `rho = k/m`.
    pub fn to_phase(&self) -> PfResult<PhaseCoord> {
        if self.n == 0 {
            return Err(PfError::DivideByZero {
                context: format!("instance {self} has zero ambient dimension"),
            });
        }
        if self.m == 0 {
            return Err(PfError::DivideByZero {
                context: format!("instance {self} has zero measurement count"),
            });
        }
        Ok(PhaseCoord::new(
            self.m as f64 / self.n as f64,
            self.k as f64 / self.m as f64,
        ))
    }
}

impl fmt::Display for InstanceCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(k={}, m={}, n={})", self.k, self.m, self.n)
    }
}

/// A point in the normalized phase plane, each axis nominally in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseCoord {
    pub delta: f64,
    pub rho: f64,
}

impl PhaseCoord {
    pub fn new(delta: f64, rho: f64) -> Self {
        Self { delta, rho }
    }

    /// Nearest valid instance at ambient dimension `n`.
    ///
    /// `m` rounds from `delta * n` and `k` from `rho * delta * n`; they are
    /// clamped into `1..=n` and `1..=m` respectively, so degenerate or
    /// out-of-range coordinates yield the nearest valid instance instead of
    /// failing.
    pub fn to_instance(&self, n: u32) -> InstanceCoord {
        let m = ((self.delta * n as f64).round() as i64).clamp(1, i64::from(n.max(1))) as u32;
        let k = ((self.rho * self.delta * n as f64).round() as i64).clamp(1, i64::from(m)) as u32;
        InstanceCoord::new(k, m, n)
    }

    /// Bitwise coordinate equality, used to de-duplicate raw proposals.
    pub fn same_point(&self, other: &PhaseCoord) -> bool {
        self.delta == other.delta && self.rho == other.rho
    }
}

impl fmt::Display for PhaseCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(delta={}, rho={})", self.delta, self.rho)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_of_instance() {
        let inst = InstanceCoord::new(50, 100, 1000);
        let phase = inst.to_phase().unwrap();
        assert_eq!(phase.delta, 0.1);
        assert_eq!(phase.rho, 0.5);
    }

    #[test]
    fn exact_grid_points_round_trip() {
        let inst = InstanceCoord::new(100, 500, 1000);
        let phase = inst.to_phase().unwrap();
        assert_eq!(phase.to_instance(1000), inst);

        let phase = PhaseCoord::new(0.1, 0.5);
        let inst = phase.to_instance(1000);
        assert_eq!(inst, InstanceCoord::new(50, 100, 1000));
        assert_eq!(inst.to_phase().unwrap(), phase);
    }

    #[test]
    fn round_trip_error_is_bounded_by_rounding() {
        let n = 1000u32;
        for i in 1..10 {
            for j in 1..10 {
                let delta = i as f64 / 10.0;
                let rho = j as f64 / 10.0;
                let inst = PhaseCoord::new(delta, rho).to_instance(n);
                let back = inst.to_phase().unwrap();
                // m is off by at most half a grid step; rho compounds the
                // rounding of both k and m.
                assert!((back.delta - delta).abs() <= 0.5 / n as f64 + 1e-12);
                let rho_bound = 1.0 / (delta * n as f64 - 0.5);
                assert!(
                    (back.rho - rho).abs() <= rho_bound,
                    "rho {} -> {} at delta {}",
                    rho,
                    back.rho,
                    delta
                );
            }
        }
    }

    #[test]
    fn degenerate_coordinates_clamp_to_smallest_instance() {
        let inst = PhaseCoord::new(1e-9, 1e-9).to_instance(1000);
        assert_eq!(inst, InstanceCoord::new(1, 1, 1000));

        let inst = PhaseCoord::new(0.0, 0.0).to_instance(1000);
        assert_eq!(inst, InstanceCoord::new(1, 1, 1000));
    }

    #[test]
    fn out_of_range_coordinates_clamp_to_valid_instances() {
        // delta past 1 cannot push m beyond n.
        let inst = PhaseCoord::new(1.5, 1.0).to_instance(100);
        assert_eq!(inst, InstanceCoord::new(100, 100, 100));

        // rho past 1 cannot push k beyond m.
        let inst = PhaseCoord::new(0.5, 1.5).to_instance(100);
        assert_eq!(inst, InstanceCoord::new(50, 50, 100));
    }

    #[test]
    fn unit_instance_round_trips() {
        let inst = InstanceCoord::new(1, 1, 1);
        let phase = inst.to_phase().unwrap();
        assert_eq!(phase, PhaseCoord::new(1.0, 1.0));
        assert_eq!(phase.to_instance(1), inst);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let err = InstanceCoord::new(1, 0, 1000).to_phase().unwrap_err();
        assert!(matches!(err, PfError::DivideByZero { .. }));

        let err = InstanceCoord::new(1, 10, 0).to_phase().unwrap_err();
        assert!(matches!(err, PfError::DivideByZero { .. }));
    }

    #[test]
    fn same_point_compares_exact_coordinates() {
        let a = PhaseCoord::new(0.25, 0.75);
        assert!(a.same_point(&PhaseCoord::new(0.25, 0.75)));
        assert!(!a.same_point(&PhaseCoord::new(0.25, 0.7500001)));
    }
}
