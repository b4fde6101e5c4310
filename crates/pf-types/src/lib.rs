pub mod config;
pub mod coords;
pub mod errors;
pub mod params;
pub mod problem;

pub use config::*;
pub use coords::*;
pub use errors::*;
pub use params::*;
pub use problem::*;
