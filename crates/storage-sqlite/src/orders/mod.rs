//! SQLite storage for orders as seen by the outbound push engine.

pub mod model;
pub mod repository;

pub use model::{OrderDB, OrderLineDB};
pub use repository::OrderRepository;
