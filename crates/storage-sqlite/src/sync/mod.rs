//! SQLite storage for reconciliation state: entity mappings, cursors, sync
//! logs and the retry queue.

pub mod model;
pub mod repository;

pub use model::{EntityMappingDB, RetryQueueItemDB, SyncCursorDB, SyncLogDB};
pub use repository::{
    MappingRepository, RetryQueueRepository, SyncCursorRepository, SyncLogRepository,
};

use shoplink_core::errors::Result;

/// Enums are stored as their serde string form without the JSON quotes.
pub(crate) fn enum_to_db<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.trim_matches('"').to_string())
}

pub(crate) fn enum_from_db<T: serde::de::DeserializeOwned>(value: &str) -> Result<T> {
    Ok(serde_json::from_str(&format!("\"{}\"", value))?)
}
