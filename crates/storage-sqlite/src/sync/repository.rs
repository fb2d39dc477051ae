//! Repositories for reconciliation state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use shoplink_core::errors::Result;
use shoplink_core::repositories::{
    MappingRepositoryTrait, RetryQueueRepositoryTrait, SyncCursorRepositoryTrait,
    SyncLogRepositoryTrait,
};
use shoplink_core::sync::{
    EntityMapping, EntityType, MappingStatus, NewEntityMapping, NewRetryQueueItem,
    NewSyncLogEntry, RetryQueueItem, RetryStatus, SyncLogEntry, SyncStatus,
};

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{entity_mappings, retry_queue, sync_cursors, sync_logs};

use super::model::{EntityMappingDB, RetryQueueItemDB, SyncCursorDB, SyncLogDB};
use super::enum_to_db;

pub struct MappingRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MappingRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        MappingRepository { pool, writer }
    }
}

#[async_trait]
impl MappingRepositoryTrait for MappingRepository {
    fn find_by_local(
        &self,
        entity_type: EntityType,
        local_id: &str,
    ) -> Result<Option<EntityMapping>> {
        let mut conn = get_connection(&self.pool)?;
        let row = entity_mappings::table
            .filter(entity_mappings::entity_type.eq(enum_to_db(&entity_type)?))
            .filter(entity_mappings::local_id.eq(local_id))
            .filter(entity_mappings::status.eq(enum_to_db(&MappingStatus::Active)?))
            .first::<EntityMappingDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(EntityMappingDB::into_domain).transpose()
    }

    fn find_by_external(
        &self,
        entity_type: EntityType,
        external_id: i64,
    ) -> Result<Option<EntityMapping>> {
        let mut conn = get_connection(&self.pool)?;
        let row = entity_mappings::table
            .filter(entity_mappings::entity_type.eq(enum_to_db(&entity_type)?))
            .filter(entity_mappings::external_id.eq(external_id))
            .filter(entity_mappings::status.eq(enum_to_db(&MappingStatus::Active)?))
            .first::<EntityMappingDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(EntityMappingDB::into_domain).transpose()
    }

    async fn create(&self, new_mapping: NewEntityMapping) -> Result<EntityMapping> {
        self.writer
            .exec(move |conn| {
                let row = EntityMappingDB {
                    id: Uuid::new_v4().to_string(),
                    entity_type: enum_to_db(&new_mapping.entity_type)?,
                    local_id: new_mapping.local_id,
                    external_id: new_mapping.external_id,
                    external_code: new_mapping.external_code,
                    status: enum_to_db(&MappingStatus::Active)?,
                    mapped_at: Utc::now().to_rfc3339(),
                    unmapped_at: None,
                    unmapped_reason: None,
                };
                let inserted = diesel::insert_into(entity_mappings::table)
                    .values(&row)
                    .returning(EntityMappingDB::as_returning())
                    .get_result::<EntityMappingDB>(conn)
                    .map_err(StorageError::from)?;
                inserted.into_domain()
            })
            .await
    }

    async fn unmap(&self, mapping_id: String, reason: String) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::update(entity_mappings::table.find(mapping_id))
                    .set((
                        entity_mappings::status.eq(enum_to_db(&MappingStatus::Unmapped)?),
                        entity_mappings::unmapped_at.eq(Utc::now().to_rfc3339()),
                        entity_mappings::unmapped_reason.eq(reason),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

pub struct SyncCursorRepository {
    pool: Arc<DbPool>,
}

impl SyncCursorRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        SyncCursorRepository { pool }
    }
}

impl SyncCursorRepositoryTrait for SyncCursorRepository {
    fn get(&self, entity_type: EntityType) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_cursors::table
            .find(enum_to_db(&entity_type)?)
            .first::<SyncCursorDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(|cursor| cursor.version).unwrap_or(0))
    }
}

pub struct SyncLogRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SyncLogRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SyncLogRepository { pool, writer }
    }
}

/// Advances the entity type's cursor to `version` unless it is already at or
/// past it.
fn advance_cursor(
    conn: &mut SqliteConnection,
    entity_type: &str,
    version: i64,
) -> Result<()> {
    let current = sync_cursors::table
        .find(entity_type)
        .first::<SyncCursorDB>(conn)
        .optional()
        .map_err(StorageError::from)?;
    if current.as_ref().is_some_and(|row| row.version >= version) {
        return Ok(());
    }
    let row = SyncCursorDB {
        entity_type: entity_type.to_string(),
        version,
        updated_at: Utc::now().to_rfc3339(),
    };
    diesel::insert_into(sync_cursors::table)
        .values(&row)
        .on_conflict(sync_cursors::entity_type)
        .do_update()
        .set(&row)
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

#[async_trait]
impl SyncLogRepositoryTrait for SyncLogRepository {
    async fn append(&self, entry: NewSyncLogEntry) -> Result<SyncLogEntry> {
        self.writer
            .exec(move |conn| {
                let row = SyncLogDB {
                    id: Uuid::new_v4().to_string(),
                    entity_type: enum_to_db(&entry.entity_type)?,
                    external_version: entry.external_version,
                    records_processed: entry.records_processed,
                    records_succeeded: entry.records_succeeded,
                    records_failed: entry.records_failed,
                    status: enum_to_db(&entry.status)?,
                    error_message: entry.error_message,
                    started_at: entry.started_at,
                    completed_at: entry.completed_at,
                    duration_ms: entry.duration_ms,
                };
                let inserted = diesel::insert_into(sync_logs::table)
                    .values(&row)
                    .returning(SyncLogDB::as_returning())
                    .get_result::<SyncLogDB>(conn)
                    .map_err(StorageError::from)?;

                // The watermark and its audit row commit together.
                if entry.status == SyncStatus::Success {
                    if let Some(version) = entry.external_version {
                        advance_cursor(conn, &inserted.entity_type, version)?;
                    }
                }

                inserted.into_domain()
            })
            .await
    }

    fn last_for(&self, entity_type: EntityType) -> Result<Option<SyncLogEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_logs::table
            .filter(sync_logs::entity_type.eq(enum_to_db(&entity_type)?))
            .order(sync_logs::completed_at.desc())
            .first::<SyncLogDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(SyncLogDB::into_domain).transpose()
    }
}

pub struct RetryQueueRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl RetryQueueRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        RetryQueueRepository { pool, writer }
    }
}

#[async_trait]
impl RetryQueueRepositoryTrait for RetryQueueRepository {
    async fn enqueue(&self, item: NewRetryQueueItem) -> Result<RetryQueueItem> {
        self.writer
            .exec(move |conn| {
                let row = RetryQueueItemDB {
                    id: Uuid::new_v4().to_string(),
                    operation: enum_to_db(&item.operation)?,
                    entity_type: enum_to_db(&item.entity_type)?,
                    entity_id: item.entity_id,
                    status: enum_to_db(&RetryStatus::Pending)?,
                    priority: item.priority,
                    attempt_count: 0,
                    max_attempts: item.max_attempts,
                    scheduled_at: Utc::now().to_rfc3339(),
                    next_retry_at: None,
                    last_error: None,
                    payload: item.payload,
                    response: None,
                };
                let inserted = diesel::insert_into(retry_queue::table)
                    .values(&row)
                    .returning(RetryQueueItemDB::as_returning())
                    .get_result::<RetryQueueItemDB>(conn)
                    .map_err(StorageError::from)?;
                inserted.into_domain()
            })
            .await
    }

    fn due(&self, now: &str, limit: i64) -> Result<Vec<RetryQueueItem>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = retry_queue::table
            .filter(retry_queue::status.eq(enum_to_db(&RetryStatus::Pending)?))
            .filter(
                retry_queue::next_retry_at
                    .le(now.to_string())
                    .or(retry_queue::next_retry_at
                        .is_null()
                        .and(retry_queue::scheduled_at.le(now.to_string()))),
            )
            .order((retry_queue::priority.asc(), retry_queue::scheduled_at.asc()))
            .limit(limit)
            .load::<RetryQueueItemDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(RetryQueueItemDB::into_domain)
            .collect()
    }

    async fn mark_processing(&self, item_id: String) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::update(retry_queue::table.find(item_id))
                    .set(retry_queue::status.eq(enum_to_db(&RetryStatus::Processing)?))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn mark_succeeded(&self, item_id: String, response: Option<String>) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::update(retry_queue::table.find(item_id))
                    .set((
                        retry_queue::status.eq(enum_to_db(&RetryStatus::Succeeded)?),
                        retry_queue::response.eq(response),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn record_failure(
        &self,
        item_id: String,
        error: String,
        next_retry_at: String,
    ) -> Result<RetryStatus> {
        self.writer
            .exec(move |conn| {
                let row = retry_queue::table
                    .find(&item_id)
                    .first::<RetryQueueItemDB>(conn)
                    .map_err(StorageError::from)?;

                let attempts = row.attempt_count + 1;
                let status = if attempts >= row.max_attempts {
                    RetryStatus::Failed
                } else {
                    RetryStatus::Pending
                };
                let retry_at = match status {
                    RetryStatus::Pending => Some(next_retry_at),
                    _ => None,
                };

                diesel::update(retry_queue::table.find(&item_id))
                    .set((
                        retry_queue::status.eq(enum_to_db(&status)?),
                        retry_queue::attempt_count.eq(attempts),
                        retry_queue::last_error.eq(error),
                        retry_queue::next_retry_at.eq(retry_at),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(status)
            })
            .await
    }

    fn list_dead_letters(&self) -> Result<Vec<RetryQueueItem>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = retry_queue::table
            .filter(retry_queue::status.eq(enum_to_db(&RetryStatus::Failed)?))
            .order(retry_queue::scheduled_at.asc())
            .load::<RetryQueueItemDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(RetryQueueItemDB::into_domain)
            .collect()
    }
}
