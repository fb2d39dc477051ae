//! Reconciliation value types: mappings, cursors, log entries, retry items.

use serde::{Deserialize, Serialize};

/// Entity kinds tracked by the reconciliation engine.
///
/// The declaration order here is incidental; the mandatory inbound apply
/// order lives in [`super::INBOUND_STAGE_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    ProductCategory,
    Product,
    ProductDetail,
    Inventory,
    ProductImage,
    Person,
    Order,
    /// Used only for log entries covering a whole run.
    All,
}

/// Mandatory inbound apply order. Later stages resolve references created
/// by earlier ones (inventory needs the product mapped, images need the
/// product row, and so on).
pub const INBOUND_STAGE_ORDER: [EntityType; 6] = [
    EntityType::ProductCategory,
    EntityType::Product,
    EntityType::ProductDetail,
    EntityType::Inventory,
    EntityType::ProductImage,
    EntityType::Person,
];

/// Lifecycle state of an entity mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStatus {
    Active,
    Unmapped,
}

/// Durable correspondence between a local entity and its external
/// counterpart. Never hard-deleted; broken correspondences are soft-marked
/// [`MappingStatus::Unmapped`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMapping {
    pub id: String,
    pub entity_type: EntityType,
    pub local_id: String,
    pub external_id: i64,
    pub external_code: Option<String>,
    pub status: MappingStatus,
    pub mapped_at: String,
    pub unmapped_at: Option<String>,
    pub unmapped_reason: Option<String>,
}

/// Payload for recording a newly observed correspondence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntityMapping {
    pub entity_type: EntityType,
    pub local_id: String,
    pub external_id: i64,
    pub external_code: Option<String>,
}

/// Outcome of one sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Failed,
}

/// One append-only audit row per sync attempt per entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogEntry {
    pub id: String,
    pub entity_type: EntityType,
    pub external_version: Option<i64>,
    pub records_processed: i32,
    pub records_succeeded: i32,
    pub records_failed: i32,
    pub status: SyncStatus,
    pub error_message: Option<String>,
    pub started_at: String,
    pub completed_at: String,
    pub duration_ms: i64,
}

/// Payload for appending a sync log row. A successful entry carrying an
/// `external_version` also advances the entity type's cursor in the same
/// write (see `SyncLogRepositoryTrait::append`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSyncLogEntry {
    pub entity_type: EntityType,
    pub external_version: Option<i64>,
    pub records_processed: i32,
    pub records_succeeded: i32,
    pub records_failed: i32,
    pub status: SyncStatus,
    pub error_message: Option<String>,
    pub started_at: String,
    pub completed_at: String,
    pub duration_ms: i64,
}

/// Retry queue item lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStatus {
    Pending,
    Processing,
    Succeeded,
    /// Dead-letter: retry budget exhausted, excluded from future drains.
    Failed,
}

/// Kinds of deferred work the retry queue can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOperation {
    OrderPush,
    CatalogPull,
}

/// One unit of deferred, retriable work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryQueueItem {
    pub id: String,
    pub operation: RetryOperation,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub status: RetryStatus,
    /// Lower value drains first.
    pub priority: i32,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub scheduled_at: String,
    pub next_retry_at: Option<String>,
    pub last_error: Option<String>,
    /// Serialized request for the deferred operation.
    pub payload: String,
    /// Serialized external reply, stored on success.
    pub response: Option<String>,
}

/// Payload for enqueueing deferred work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRetryQueueItem {
    pub operation: RetryOperation,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub priority: i32,
    pub max_attempts: i32,
    pub payload: String,
}

/// Per-record apply result inside an inbound batch.
///
/// Modeled explicitly so batch outcomes are testable without inspecting
/// logs: a skip is a benign no-op, a failure is counted but never aborts
/// sibling records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Skipped(String),
    Failed(String),
}

/// Counters accumulated over one entity type's batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub skipped: i32,
}

impl BatchStats {
    /// Fold one record outcome into the counters. Skips count as benign
    /// successes for audit purposes but are tracked separately.
    pub fn record(&mut self, outcome: &ApplyOutcome) {
        self.processed += 1;
        match outcome {
            ApplyOutcome::Applied => self.succeeded += 1,
            ApplyOutcome::Skipped(_) => {
                self.succeeded += 1;
                self.skipped += 1;
            }
            ApplyOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Aggregate result of one inbound run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRunSummary {
    pub status: SyncStatus,
    pub records_processed: i32,
    pub records_succeeded: i32,
    pub records_failed: i32,
    pub duration_ms: i64,
}

/// Aggregate result of one outbound run. Observability only; per-order
/// failures never escape the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRunSummary {
    pub submitted: i32,
    pub failed: i32,
    pub skipped_lines: i32,
}
