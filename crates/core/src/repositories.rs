//! Repository contracts implemented by the storage layer.
//!
//! Reads are synchronous pool lookups; mutations go through the storage
//! writer and are therefore async. The engines consume these as
//! `Arc<dyn Trait>` so tests can substitute in-memory fakes.

use async_trait::async_trait;

use crate::catalog::{
    NewParty, NewProduct, NewProductCategory, NewProductImage, Party, Product, ProductCategory,
    ProductImage,
};
use crate::errors::Result;
use crate::orders::{Order, OrderLine};
use crate::sync::{
    EntityMapping, EntityType, NewEntityMapping, NewRetryQueueItem, NewSyncLogEntry,
    RetryQueueItem, RetryStatus, SyncLogEntry,
};
use rust_decimal::Decimal;

/// Bidirectional index between local and external entity identity.
#[async_trait]
pub trait MappingRepositoryTrait: Send + Sync {
    fn find_by_local(&self, entity_type: EntityType, local_id: &str)
        -> Result<Option<EntityMapping>>;

    fn find_by_external(
        &self,
        entity_type: EntityType,
        external_id: i64,
    ) -> Result<Option<EntityMapping>>;

    /// Fails with a unique violation when either side of the pair is
    /// already mapped for this entity type.
    async fn create(&self, new_mapping: NewEntityMapping) -> Result<EntityMapping>;

    /// Soft-break a correspondence. The row is kept for audit.
    async fn unmap(&self, mapping_id: String, reason: String) -> Result<()>;
}

/// Per-entity-type inbound watermark.
pub trait SyncCursorRepositoryTrait: Send + Sync {
    /// Highest external version absorbed for the entity type; 0 if never
    /// synced.
    fn get(&self, entity_type: EntityType) -> Result<i64>;
}

/// Append-only audit trail of sync attempts.
#[async_trait]
pub trait SyncLogRepositoryTrait: Send + Sync {
    /// Append one audit row. When the entry is successful and carries an
    /// `external_version` greater than the current cursor, the entity
    /// type's cursor advances in the same write. The cursor never moves
    /// backwards.
    async fn append(&self, entry: NewSyncLogEntry) -> Result<SyncLogEntry>;

    /// Most recent entry for an entity type.
    fn last_for(&self, entity_type: EntityType) -> Result<Option<SyncLogEntry>>;
}

/// Generic durable queue for deferred, retriable operations.
#[async_trait]
pub trait RetryQueueRepositoryTrait: Send + Sync {
    async fn enqueue(&self, item: NewRetryQueueItem) -> Result<RetryQueueItem>;

    /// Pending items whose `next_retry_at` (or `scheduled_at` on the first
    /// attempt) is due, ordered by priority then scheduled time.
    /// Dead-lettered items are never selected.
    fn due(&self, now: &str, limit: i64) -> Result<Vec<RetryQueueItem>>;

    async fn mark_processing(&self, item_id: String) -> Result<()>;

    async fn mark_succeeded(&self, item_id: String, response: Option<String>) -> Result<()>;

    /// Record a failed attempt: increments the attempt count, stores the
    /// error, and either reschedules at `next_retry_at` or dead-letters the
    /// item once the budget is exhausted. Returns the resulting status.
    async fn record_failure(
        &self,
        item_id: String,
        error: String,
        next_retry_at: String,
    ) -> Result<RetryStatus>;

    /// Dead-lettered items awaiting operator inspection.
    fn list_dead_letters(&self) -> Result<Vec<RetryQueueItem>>;
}

/// Product category records.
#[async_trait]
pub trait CategoryRepositoryTrait: Send + Sync {
    fn get(&self, category_id: &str) -> Result<Option<ProductCategory>>;
    async fn insert(&self, new_category: NewProductCategory) -> Result<ProductCategory>;
    async fn rename(&self, category_id: String, name: String) -> Result<()>;
}

/// Product records, including the sync-owned enrichment fields.
#[async_trait]
pub trait ProductRepositoryTrait: Send + Sync {
    fn get(&self, product_id: &str) -> Result<Option<Product>>;
    async fn insert(&self, new_product: NewProduct) -> Result<Product>;

    /// Update the mutable catalog fields only; creation-time fields are
    /// never rewritten by sync.
    async fn update_catalog_fields(
        &self,
        product_id: String,
        name: String,
        description: Option<String>,
        category_id: Option<String>,
    ) -> Result<()>;

    /// Apply resolved pricing. A `None` barcode leaves the stored barcode
    /// untouched; sync never clears barcodes.
    async fn update_pricing(
        &self,
        product_id: String,
        price: Decimal,
        barcode: Option<String>,
    ) -> Result<()>;

    async fn set_available_stock(&self, product_id: String, quantity: i32) -> Result<()>;
}

/// Product image records.
#[async_trait]
pub trait ImageRepositoryTrait: Send + Sync {
    fn list_for_product(&self, product_id: &str) -> Result<Vec<ProductImage>>;
    async fn insert(&self, new_image: NewProductImage) -> Result<ProductImage>;
}

/// External party (customer) records.
#[async_trait]
pub trait PartyRepositoryTrait: Send + Sync {
    async fn insert(&self, new_party: NewParty) -> Result<Party>;
}

/// Orders and their lines, as seen by the outbound engine.
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    /// Orders paid locally but not yet acknowledged by the external system.
    fn list_awaiting_push(&self) -> Result<Vec<Order>>;

    fn lines_for(&self, order_id: &str) -> Result<Vec<OrderLine>>;

    /// Store the external surrogate identity; this excludes the order from
    /// all future push runs.
    async fn mark_synced(&self, order_id: String, external_order_id: i64) -> Result<()>;

    async fn mark_sync_error(&self, order_id: String, error: String) -> Result<()>;
}
