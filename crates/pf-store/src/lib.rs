pub mod checkpoint;
pub mod store;

pub use checkpoint::*;
pub use store::*;
