//! Database models for the reconciliation state tables.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use shoplink_core::errors::Result;
use shoplink_core::sync::{EntityMapping, RetryQueueItem, SyncLogEntry};

use super::enum_from_db;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::entity_mappings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EntityMappingDB {
    pub id: String,
    pub entity_type: String,
    pub local_id: String,
    pub external_id: i64,
    pub external_code: Option<String>,
    pub status: String,
    pub mapped_at: String,
    pub unmapped_at: Option<String>,
    pub unmapped_reason: Option<String>,
}

impl EntityMappingDB {
    pub fn into_domain(self) -> Result<EntityMapping> {
        Ok(EntityMapping {
            entity_type: enum_from_db(&self.entity_type)?,
            status: enum_from_db(&self.status)?,
            id: self.id,
            local_id: self.local_id,
            external_id: self.external_id,
            external_code: self.external_code,
            mapped_at: self.mapped_at,
            unmapped_at: self.unmapped_at,
            unmapped_reason: self.unmapped_reason,
        })
    }
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(primary_key(entity_type))]
#[diesel(table_name = crate::schema::sync_cursors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncCursorDB {
    pub entity_type: String,
    pub version: i64,
    pub updated_at: String,
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::sync_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncLogDB {
    pub id: String,
    pub entity_type: String,
    pub external_version: Option<i64>,
    pub records_processed: i32,
    pub records_succeeded: i32,
    pub records_failed: i32,
    pub status: String,
    pub error_message: Option<String>,
    pub started_at: String,
    pub completed_at: String,
    pub duration_ms: i64,
}

impl SyncLogDB {
    pub fn into_domain(self) -> Result<SyncLogEntry> {
        Ok(SyncLogEntry {
            entity_type: enum_from_db(&self.entity_type)?,
            status: enum_from_db(&self.status)?,
            id: self.id,
            external_version: self.external_version,
            records_processed: self.records_processed,
            records_succeeded: self.records_succeeded,
            records_failed: self.records_failed,
            error_message: self.error_message,
            started_at: self.started_at,
            completed_at: self.completed_at,
            duration_ms: self.duration_ms,
        })
    }
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::retry_queue)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RetryQueueItemDB {
    pub id: String,
    pub operation: String,
    pub entity_type: String,
    pub entity_id: String,
    pub status: String,
    pub priority: i32,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub scheduled_at: String,
    pub next_retry_at: Option<String>,
    pub last_error: Option<String>,
    pub payload: String,
    pub response: Option<String>,
}

impl RetryQueueItemDB {
    pub fn into_domain(self) -> Result<RetryQueueItem> {
        Ok(RetryQueueItem {
            operation: enum_from_db(&self.operation)?,
            entity_type: enum_from_db(&self.entity_type)?,
            status: enum_from_db(&self.status)?,
            id: self.id,
            entity_id: self.entity_id,
            priority: self.priority,
            attempt_count: self.attempt_count,
            max_attempts: self.max_attempts,
            scheduled_at: self.scheduled_at,
            next_retry_at: self.next_retry_at,
            last_error: self.last_error,
            payload: self.payload,
            response: self.response,
        })
    }
}
