//! In-memory fakes for engine tests: a scripted ERP endpoint and repository
//! doubles backed by `Mutex<Vec<_>>`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use shoplink_core::catalog::{
    NewParty, NewProduct, NewProductCategory, NewProductImage, Party, Product, ProductCategory,
    ProductImage,
};
use shoplink_core::errors::{DatabaseError, Error, Result};
use shoplink_core::orders::{Order, OrderLine};
use shoplink_core::repositories::{
    CategoryRepositoryTrait, ImageRepositoryTrait, MappingRepositoryTrait, OrderRepositoryTrait,
    PartyRepositoryTrait, ProductRepositoryTrait, RetryQueueRepositoryTrait,
    SyncCursorRepositoryTrait, SyncLogRepositoryTrait,
};
use shoplink_core::sync::{
    EntityMapping, EntityType, MappingStatus, NewEntityMapping, NewRetryQueueItem,
    NewSyncLogEntry, RetryQueueItem, RetryStatus, SyncLogEntry, SyncStatus,
};
use shoplink_erp_client::{
    ErpClientError, GetAllDataRequest, GetAllDataResponse, SaveOrderRequest, SaveOrderResponse,
    SessionToken,
};

use crate::api::ErpApi;
use crate::inbound::{InboundSyncDeps, InboundSyncEngine};
use crate::outbound::OutboundSyncEngine;

type WireResult<T> = std::result::Result<T, (u16, String)>;

#[derive(Default)]
pub(crate) struct FakeErpApi {
    pub pull_results: Mutex<VecDeque<WireResult<GetAllDataResponse>>>,
    pub save_results: Mutex<VecDeque<WireResult<SaveOrderResponse>>>,
    pub pull_requests: Mutex<Vec<GetAllDataRequest>>,
    pub save_requests: Mutex<Vec<SaveOrderRequest>>,
    pub login_failure: Mutex<Option<(u16, String)>>,
    pub invalidations: AtomicUsize,
}

impl FakeErpApi {
    pub fn script_pull(&self, response: GetAllDataResponse) {
        self.pull_results.lock().unwrap().push_back(Ok(response));
    }

    pub fn script_pull_error(&self, status: u16, message: &str) {
        self.pull_results
            .lock()
            .unwrap()
            .push_back(Err((status, message.to_string())));
    }

    pub fn script_save(&self, client_order_id: i64) {
        self.save_results
            .lock()
            .unwrap()
            .push_back(Ok(SaveOrderResponse { client_order_id }));
    }

    pub fn script_save_error(&self, status: u16, message: &str) {
        self.save_results
            .lock()
            .unwrap()
            .push_back(Err((status, message.to_string())));
    }

    pub fn fail_login(&self, status: u16, message: &str) {
        *self.login_failure.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn invalidation_count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    fn unwire<T>(scripted: Option<WireResult<T>>) -> std::result::Result<T, ErpClientError> {
        match scripted {
            Some(Ok(value)) => Ok(value),
            Some(Err((status, message))) => Err(ErpClientError::api(status, message)),
            None => Err(ErpClientError::invalid_request("no scripted response")),
        }
    }
}

#[async_trait]
impl ErpApi for FakeErpApi {
    async fn ensure_session(&self) -> std::result::Result<SessionToken, ErpClientError> {
        if let Some((status, message)) = self.login_failure.lock().unwrap().clone() {
            return Err(ErpClientError::api(status, message));
        }
        Ok(SessionToken {
            token: "test-token".to_string(),
            visitor_id: 9,
        })
    }

    async fn invalidate_session(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }

    async fn get_all_data(
        &self,
        _session: &SessionToken,
        request: GetAllDataRequest,
    ) -> std::result::Result<GetAllDataResponse, ErpClientError> {
        self.pull_requests.lock().unwrap().push(request);
        Self::unwire(self.pull_results.lock().unwrap().pop_front())
    }

    async fn save_order(
        &self,
        _session: &SessionToken,
        request: SaveOrderRequest,
    ) -> std::result::Result<SaveOrderResponse, ErpClientError> {
        self.save_requests.lock().unwrap().push(request);
        Self::unwire(self.save_results.lock().unwrap().pop_front())
    }
}

fn unique_violation(what: &str) -> Error {
    Error::Database(DatabaseError::UniqueViolation(what.to_string()))
}

#[derive(Default)]
pub(crate) struct FakeMappings {
    pub rows: Mutex<Vec<EntityMapping>>,
    counter: AtomicUsize,
}

impl FakeMappings {
    pub fn seed(&self, entity_type: EntityType, local_id: &str, external_id: i64) {
        self.rows.lock().unwrap().push(EntityMapping {
            id: format!("seeded-{}-{}", local_id, external_id),
            entity_type,
            local_id: local_id.to_string(),
            external_id,
            external_code: Some(external_id.to_string()),
            status: MappingStatus::Active,
            mapped_at: Utc::now().to_rfc3339(),
            unmapped_at: None,
            unmapped_reason: None,
        });
    }

    pub fn active(&self) -> Vec<EntityMapping> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.status == MappingStatus::Active)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MappingRepositoryTrait for FakeMappings {
    fn find_by_local(
        &self,
        entity_type: EntityType,
        local_id: &str,
    ) -> Result<Option<EntityMapping>> {
        Ok(self.active().into_iter().find(|row| {
            row.entity_type == entity_type && row.local_id == local_id
        }))
    }

    fn find_by_external(
        &self,
        entity_type: EntityType,
        external_id: i64,
    ) -> Result<Option<EntityMapping>> {
        Ok(self.active().into_iter().find(|row| {
            row.entity_type == entity_type && row.external_id == external_id
        }))
    }

    async fn create(&self, new_mapping: NewEntityMapping) -> Result<EntityMapping> {
        let mut rows = self.rows.lock().unwrap();
        let collision = rows.iter().any(|row| {
            row.status == MappingStatus::Active
                && row.entity_type == new_mapping.entity_type
                && (row.local_id == new_mapping.local_id
                    || row.external_id == new_mapping.external_id)
        });
        if collision {
            return Err(unique_violation("entity_mappings"));
        }
        let mapping = EntityMapping {
            id: format!("map-{}", self.counter.fetch_add(1, Ordering::SeqCst)),
            entity_type: new_mapping.entity_type,
            local_id: new_mapping.local_id,
            external_id: new_mapping.external_id,
            external_code: new_mapping.external_code,
            status: MappingStatus::Active,
            mapped_at: Utc::now().to_rfc3339(),
            unmapped_at: None,
            unmapped_reason: None,
        };
        rows.push(mapping.clone());
        Ok(mapping)
    }

    async fn unmap(&self, mapping_id: String, reason: String) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == mapping_id) {
            row.status = MappingStatus::Unmapped;
            row.unmapped_at = Some(Utc::now().to_rfc3339());
            row.unmapped_reason = Some(reason);
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeCursors {
    pub versions: Mutex<HashMap<EntityType, i64>>,
}

impl FakeCursors {
    pub fn set(&self, entity_type: EntityType, version: i64) {
        self.versions.lock().unwrap().insert(entity_type, version);
    }
}

impl SyncCursorRepositoryTrait for FakeCursors {
    fn get(&self, entity_type: EntityType) -> Result<i64> {
        Ok(self
            .versions
            .lock()
            .unwrap()
            .get(&entity_type)
            .copied()
            .unwrap_or(0))
    }
}

pub(crate) struct FakeLogs {
    pub entries: Mutex<Vec<SyncLogEntry>>,
    cursors: Arc<FakeCursors>,
    counter: AtomicUsize,
}

impl FakeLogs {
    pub fn new(cursors: Arc<FakeCursors>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            cursors,
            counter: AtomicUsize::new(0),
        }
    }

    pub fn entries_for(&self, entity_type: EntityType) -> Vec<SyncLogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.entity_type == entity_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SyncLogRepositoryTrait for FakeLogs {
    async fn append(&self, entry: NewSyncLogEntry) -> Result<SyncLogEntry> {
        let stored = SyncLogEntry {
            id: format!("log-{}", self.counter.fetch_add(1, Ordering::SeqCst)),
            entity_type: entry.entity_type,
            external_version: entry.external_version,
            records_processed: entry.records_processed,
            records_succeeded: entry.records_succeeded,
            records_failed: entry.records_failed,
            status: entry.status,
            error_message: entry.error_message,
            started_at: entry.started_at,
            completed_at: entry.completed_at,
            duration_ms: entry.duration_ms,
        };
        if stored.status == SyncStatus::Success {
            if let Some(version) = stored.external_version {
                let mut versions = self.cursors.versions.lock().unwrap();
                let current = versions.entry(stored.entity_type).or_insert(0);
                if version > *current {
                    *current = version;
                }
            }
        }
        self.entries.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    fn last_for(&self, entity_type: EntityType) -> Result<Option<SyncLogEntry>> {
        Ok(self.entries_for(entity_type).into_iter().last())
    }
}

#[derive(Default)]
pub(crate) struct FakeRetryQueue {
    pub items: Mutex<Vec<RetryQueueItem>>,
    counter: AtomicUsize,
}

#[async_trait]
impl RetryQueueRepositoryTrait for FakeRetryQueue {
    async fn enqueue(&self, item: NewRetryQueueItem) -> Result<RetryQueueItem> {
        let stored = RetryQueueItem {
            id: format!("retry-{}", self.counter.fetch_add(1, Ordering::SeqCst)),
            operation: item.operation,
            entity_type: item.entity_type,
            entity_id: item.entity_id,
            status: RetryStatus::Pending,
            priority: item.priority,
            attempt_count: 0,
            max_attempts: item.max_attempts,
            scheduled_at: Utc::now().to_rfc3339(),
            next_retry_at: None,
            last_error: None,
            payload: item.payload,
            response: None,
        };
        self.items.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    fn due(&self, now: &str, limit: i64) -> Result<Vec<RetryQueueItem>> {
        let mut due: Vec<RetryQueueItem> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| {
                item.status == RetryStatus::Pending
                    && item.next_retry_at.as_deref().unwrap_or(&item.scheduled_at) <= now
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.scheduled_at.cmp(&b.scheduled_at))
        });
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn mark_processing(&self, item_id: String) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|item| item.id == item_id) {
            item.status = RetryStatus::Processing;
        }
        Ok(())
    }

    async fn mark_succeeded(&self, item_id: String, response: Option<String>) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|item| item.id == item_id) {
            item.status = RetryStatus::Succeeded;
            item.response = response;
        }
        Ok(())
    }

    async fn record_failure(
        &self,
        item_id: String,
        error: String,
        next_retry_at: String,
    ) -> Result<RetryStatus> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| Error::Unexpected("unknown retry item".to_string()))?;
        item.attempt_count += 1;
        item.last_error = Some(error);
        if item.attempt_count >= item.max_attempts {
            item.status = RetryStatus::Failed;
            item.next_retry_at = None;
        } else {
            item.status = RetryStatus::Pending;
            item.next_retry_at = Some(next_retry_at);
        }
        Ok(item.status)
    }

    fn list_dead_letters(&self) -> Result<Vec<RetryQueueItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.status == RetryStatus::Failed)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeCategories {
    pub rows: Mutex<Vec<ProductCategory>>,
    counter: AtomicUsize,
}

#[async_trait]
impl CategoryRepositoryTrait for FakeCategories {
    fn get(&self, category_id: &str) -> Result<Option<ProductCategory>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == category_id)
            .cloned())
    }

    async fn insert(&self, new_category: NewProductCategory) -> Result<ProductCategory> {
        let now = Utc::now().to_rfc3339();
        let category = ProductCategory {
            id: format!("cat-{}", self.counter.fetch_add(1, Ordering::SeqCst)),
            name: new_category.name,
            created_at: now.clone(),
            updated_at: now,
        };
        self.rows.lock().unwrap().push(category.clone());
        Ok(category)
    }

    async fn rename(&self, category_id: String, name: String) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == category_id) {
            row.name = name;
            row.updated_at = Utc::now().to_rfc3339();
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeProducts {
    pub rows: Mutex<Vec<Product>>,
    counter: AtomicUsize,
}

impl FakeProducts {
    pub fn by_id(&self, product_id: &str) -> Option<Product> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == product_id)
            .cloned()
    }
}

#[async_trait]
impl ProductRepositoryTrait for FakeProducts {
    fn get(&self, product_id: &str) -> Result<Option<Product>> {
        Ok(self.by_id(product_id))
    }

    async fn insert(&self, new_product: NewProduct) -> Result<Product> {
        let now = Utc::now().to_rfc3339();
        let product = Product {
            id: format!("prod-{}", self.counter.fetch_add(1, Ordering::SeqCst)),
            name: new_product.name,
            description: new_product.description,
            category_id: new_product.category_id,
            price: new_product.price,
            barcode: None,
            available_stock: 0,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        };
        self.rows.lock().unwrap().push(product.clone());
        Ok(product)
    }

    async fn update_catalog_fields(
        &self,
        product_id: String,
        name: String,
        description: Option<String>,
        category_id: Option<String>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == product_id) {
            row.name = name;
            row.description = description;
            row.category_id = category_id;
        }
        Ok(())
    }

    async fn update_pricing(
        &self,
        product_id: String,
        price: Decimal,
        barcode: Option<String>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == product_id) {
            row.price = price;
            if let Some(code) = barcode {
                row.barcode = Some(code);
            }
        }
        Ok(())
    }

    async fn set_available_stock(&self, product_id: String, quantity: i32) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == product_id) {
            row.available_stock = quantity;
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeImages {
    pub rows: Mutex<Vec<ProductImage>>,
    counter: AtomicUsize,
}

#[async_trait]
impl ImageRepositoryTrait for FakeImages {
    fn list_for_product(&self, product_id: &str) -> Result<Vec<ProductImage>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, new_image: NewProductImage) -> Result<ProductImage> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|row| row.product_id == new_image.product_id && row.url == new_image.url)
        {
            return Err(unique_violation("product_images"));
        }
        let image = ProductImage {
            id: format!("img-{}", self.counter.fetch_add(1, Ordering::SeqCst)),
            product_id: new_image.product_id,
            url: new_image.url,
            is_primary: new_image.is_primary,
            created_at: Utc::now().to_rfc3339(),
        };
        rows.push(image.clone());
        Ok(image)
    }
}

#[derive(Default)]
pub(crate) struct FakeParties {
    pub rows: Mutex<Vec<Party>>,
    counter: AtomicUsize,
}

#[async_trait]
impl PartyRepositoryTrait for FakeParties {
    async fn insert(&self, new_party: NewParty) -> Result<Party> {
        let party = Party {
            id: format!("party-{}", self.counter.fetch_add(1, Ordering::SeqCst)),
            full_name: new_party.full_name,
            mobile: new_party.mobile,
            is_placeholder: new_party.is_placeholder,
            created_at: Utc::now().to_rfc3339(),
        };
        self.rows.lock().unwrap().push(party.clone());
        Ok(party)
    }
}

#[derive(Default)]
pub(crate) struct FakeOrders {
    pub orders: Mutex<Vec<Order>>,
    pub lines: Mutex<Vec<OrderLine>>,
}

impl FakeOrders {
    pub fn seed_order(&self, order: Order, lines: Vec<OrderLine>) {
        self.orders.lock().unwrap().push(order);
        self.lines.lock().unwrap().extend(lines);
    }

    pub fn by_id(&self, order_id: &str) -> Option<Order> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|order| order.id == order_id)
            .cloned()
    }
}

#[async_trait]
impl OrderRepositoryTrait for FakeOrders {
    fn list_awaiting_push(&self) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|order| order.awaits_push())
            .cloned()
            .collect())
    }

    fn lines_for(&self, order_id: &str) -> Result<Vec<OrderLine>> {
        Ok(self
            .lines
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn mark_synced(&self, order_id: String, external_order_id: i64) -> Result<()> {
        let mut orders = self.orders.lock().unwrap();
        if let Some(order) = orders.iter_mut().find(|order| order.id == order_id) {
            order.external_order_id = Some(external_order_id);
            order.synced_at = Some(Utc::now().to_rfc3339());
            order.sync_error = None;
        }
        Ok(())
    }

    async fn mark_sync_error(&self, order_id: String, error: String) -> Result<()> {
        let mut orders = self.orders.lock().unwrap();
        if let Some(order) = orders.iter_mut().find(|order| order.id == order_id) {
            order.sync_error = Some(error);
        }
        Ok(())
    }
}

/// One shared bundle of fakes plus ready-wired engines.
pub(crate) struct Harness {
    pub api: Arc<FakeErpApi>,
    pub mappings: Arc<FakeMappings>,
    pub cursors: Arc<FakeCursors>,
    pub logs: Arc<FakeLogs>,
    pub retry_queue: Arc<FakeRetryQueue>,
    pub categories: Arc<FakeCategories>,
    pub products: Arc<FakeProducts>,
    pub images: Arc<FakeImages>,
    pub parties: Arc<FakeParties>,
    pub orders: Arc<FakeOrders>,
}

impl Harness {
    pub fn new() -> Self {
        let cursors = Arc::new(FakeCursors::default());
        Self {
            api: Arc::new(FakeErpApi::default()),
            mappings: Arc::new(FakeMappings::default()),
            logs: Arc::new(FakeLogs::new(cursors.clone())),
            cursors,
            retry_queue: Arc::new(FakeRetryQueue::default()),
            categories: Arc::new(FakeCategories::default()),
            products: Arc::new(FakeProducts::default()),
            images: Arc::new(FakeImages::default()),
            parties: Arc::new(FakeParties::default()),
            orders: Arc::new(FakeOrders::default()),
        }
    }

    pub fn inbound(&self) -> InboundSyncEngine {
        InboundSyncEngine::new(InboundSyncDeps {
            api: self.api.clone(),
            mappings: self.mappings.clone(),
            cursors: self.cursors.clone(),
            logs: self.logs.clone(),
            retry_queue: self.retry_queue.clone(),
            categories: self.categories.clone(),
            products: self.products.clone(),
            images: self.images.clone(),
            parties: self.parties.clone(),
        })
    }

    pub fn outbound(&self) -> OutboundSyncEngine {
        OutboundSyncEngine::new(
            self.api.clone(),
            self.mappings.clone(),
            self.orders.clone(),
            self.retry_queue.clone(),
            self.logs.clone(),
        )
    }
}
