pub mod poi;
pub mod probability;
pub mod station;
pub mod types;
pub mod user;

pub use poi::*;
pub use probability::*;
pub use station::*;
pub use types::*;
pub use user::*;
