//! Per-iteration result archives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pf_types::{ProblemFailure, RunRecord};

/// Everything measured during one sampling iteration, captured before any
/// surrogate update so a run can be diagnosed or replayed from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub iteration: usize,
    pub created_at: DateTime<Utc>,
    /// Per-problem results in dispatch order (roster x proposals x seeds).
    pub records: Vec<RunRecord>,
    /// Problems that produced no usable result this iteration.
    pub failures: Vec<ProblemFailure>,
}

impl Checkpoint {
    pub fn new(iteration: usize, records: Vec<RunRecord>, failures: Vec<ProblemFailure>) -> Self {
        Self {
            iteration,
            created_at: Utc::now(),
            records,
            failures,
        }
    }
}
