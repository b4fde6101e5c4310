//! Deterministic noise-seed derivation.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use pf_types::{PfError, PfResult};

/// Inclusive lower bound for derived seeds.
pub const SEED_MIN: u64 = 99;
/// Exclusive upper bound for derived seeds.
pub const SEED_MAX: u64 = 9_999_999;

/// Derive `count` distinct noise seeds from a master seed.
///
/// The stream cipher behind the generator is platform-independent, so the
/// same master seed reproduces the same problem set anywhere. Duplicates
/// are skipped, keeping first-draw order.
pub fn derive_seeds(master_seed: u64, count: usize) -> PfResult<Vec<u64>> {
    let span = (SEED_MAX - SEED_MIN) as usize;
    if count > span {
        return Err(PfError::Config(format!(
            "cannot draw {count} distinct seeds from [{SEED_MIN}, {SEED_MAX})"
        )));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(master_seed);
    let mut seen = HashSet::with_capacity(count);
    let mut seeds = Vec::with_capacity(count);
    while seeds.len() < count {
        let candidate = rng.gen_range(SEED_MIN..SEED_MAX);
        if seen.insert(candidate) {
            seeds.push(candidate);
        }
    }
    Ok(seeds)
}
