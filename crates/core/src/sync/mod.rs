//! Sync domain models and policy helpers.

mod model;
mod policy;
mod scheduler;

pub use model::*;
pub use policy::*;
pub use scheduler::*;
