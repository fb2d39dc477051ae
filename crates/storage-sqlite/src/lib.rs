//! SQLite persistence for the shoplink reconciliation engine: schema,
//! migrations, connection pool and repository implementations of the core
//! contracts.

pub mod catalog;
pub mod db;
pub mod errors;
pub mod orders;
pub mod schema;
pub mod sync;

pub(crate) mod money;
