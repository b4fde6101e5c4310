//! # pf-surrogate
//!
//! Per-solver surrogate models for phase-diagram sampling.
//!
//! Each model wraps two external Gaussian-process programs: an initializer
//! that seeds a proposal queue over the phase plane, and a conditioning
//! step that turns the accumulated observation history into fresh
//! candidate coordinates.

mod model;

pub use model::{SurrogateModel, SurrogateState};
