pub mod capacity;
pub mod types;

pub use capacity::*;
pub use types::*;
