//! Core domain models, repository contracts and sync primitives for the
//! shoplink ERP reconciliation engine.

pub mod catalog;
pub mod errors;
pub mod orders;
pub mod repositories;
pub mod sync;

pub use errors::{DatabaseError, Error, Result};
