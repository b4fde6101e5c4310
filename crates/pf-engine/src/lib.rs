// PhaseFront sampling engine
// Coordinates surrogate proposals, parallel solver execution, error
// metrics, and persistence across experiment iterations

pub mod driver;
pub mod metrics;
pub mod pool;
pub mod seeds;

pub use driver::{ExperimentDriver, ExperimentState, ExperimentStatus, RunReport};
pub use pool::{ProblemOutcome, WorkerPool};
pub use seeds::derive_seeds;
