//! SQLite storage for catalog records enriched by inbound sync.

pub mod model;
pub mod repository;

pub use model::{PartyDB, ProductCategoryDB, ProductDB, ProductImageDB};
pub use repository::{CategoryRepository, ImageRepository, PartyRepository, ProductRepository};
