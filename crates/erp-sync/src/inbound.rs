//! Inbound catalog pull: one batched ERP read, applied stage by stage in
//! dependency order, with per-record failure isolation and cursor advance
//! only on fully successful stages.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use shoplink_core::catalog::{NewParty, NewProduct, NewProductCategory, NewProductImage};
use shoplink_core::errors::{Error, Result};
use shoplink_core::repositories::{
    CategoryRepositoryTrait, ImageRepositoryTrait, MappingRepositoryTrait, PartyRepositoryTrait,
    ProductRepositoryTrait, RetryQueueRepositoryTrait, SyncCursorRepositoryTrait,
    SyncLogRepositoryTrait,
};
use shoplink_core::sync::{
    resolve_list_price, ApplyOutcome, BatchStats, EntityType, InboundRunSummary, NewEntityMapping,
    NewRetryQueueItem, NewSyncLogEntry, RetryOperation, RetryQueueItem, SyncStatus,
    DEFAULT_MAX_ATTEMPTS, INBOUND_STAGE_ORDER,
};
use shoplink_erp_client::{
    ErpClientError, ErpNewPicture, ErpPerson, ErpProduct, ErpProductDetail, ErpProductGroup,
    ErpRetryClass, ErpStoreAsset, GetAllDataRequest, GetAllDataResponse,
};

use crate::api::ErpApi;
use crate::retry::RetryExecutor;

/// Everything the inbound engine needs, bundled so construction sites stay
/// readable.
pub struct InboundSyncDeps {
    pub api: Arc<dyn ErpApi>,
    pub mappings: Arc<dyn MappingRepositoryTrait>,
    pub cursors: Arc<dyn SyncCursorRepositoryTrait>,
    pub logs: Arc<dyn SyncLogRepositoryTrait>,
    pub retry_queue: Arc<dyn RetryQueueRepositoryTrait>,
    pub categories: Arc<dyn CategoryRepositoryTrait>,
    pub products: Arc<dyn ProductRepositoryTrait>,
    pub images: Arc<dyn ImageRepositoryTrait>,
    pub parties: Arc<dyn PartyRepositoryTrait>,
}

/// Engine-level pull failures, kept apart from record-level outcomes so the
/// retry classification survives until the run wrap-up.
enum PullError {
    Erp(ErpClientError),
    App(Error),
}

impl From<ErpClientError> for PullError {
    fn from(err: ErpClientError) -> Self {
        PullError::Erp(err)
    }
}

impl From<Error> for PullError {
    fn from(err: Error) -> Self {
        PullError::App(err)
    }
}

pub struct InboundSyncEngine {
    deps: InboundSyncDeps,
    cancelled: Arc<AtomicBool>,
    cycle_mutex: Mutex<()>,
}

impl InboundSyncEngine {
    pub fn new(deps: InboundSyncDeps) -> Self {
        Self {
            deps,
            cancelled: Arc::new(AtomicBool::new(false)),
            cycle_mutex: Mutex::new(()),
        }
    }

    /// Shared flag checked between stages; set it to stop the current run
    /// after the stage in flight.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Run one pull cycle. Cycles are serialized; a second caller waits for
    /// the one in flight.
    pub async fn run(&self) -> Result<InboundRunSummary> {
        self.run_internal(false).await
    }

    /// Scheduler entry point: like [`run`](Self::run), but a transient pull
    /// failure also enqueues a catalog-pull retry so the drain loop retries
    /// sooner than the next scheduled cycle.
    pub async fn run_scheduled(&self) -> Result<InboundRunSummary> {
        self.run_internal(true).await
    }

    async fn run_internal(&self, enqueue_on_transient: bool) -> Result<InboundRunSummary> {
        let _guard = self.cycle_mutex.lock().await;
        let run_started = Instant::now();
        let started_at = Utc::now().to_rfc3339();

        // Runs are fire-and-forget: a failed pull is logged and reported
        // through the summary, never thrown at the trigger.
        match self.pull_and_apply(run_started).await {
            Ok(summary) => {
                info!(
                    "Inbound sync finished: {} processed, {} failed in {}ms",
                    summary.records_processed, summary.records_failed, summary.duration_ms
                );
                Ok(summary)
            }
            Err(PullError::Erp(err)) => {
                error!("Inbound sync aborted: {}", err);
                match err.retry_class() {
                    ErpRetryClass::ReauthRequired => self.deps.api.invalidate_session().await,
                    ErpRetryClass::Retryable if enqueue_on_transient => {
                        self.deps
                            .retry_queue
                            .enqueue(NewRetryQueueItem {
                                operation: RetryOperation::CatalogPull,
                                entity_type: EntityType::All,
                                entity_id: "catalog".to_string(),
                                priority: 50,
                                max_attempts: DEFAULT_MAX_ATTEMPTS,
                                payload: "{}".to_string(),
                            })
                            .await?;
                    }
                    _ => {}
                }
                self.log_run_failure(&started_at, run_started, err.to_string())
                    .await?;
                Ok(Self::failed_summary(run_started))
            }
            Err(PullError::App(err)) => {
                error!("Inbound sync aborted: {}", err);
                self.log_run_failure(&started_at, run_started, err.to_string())
                    .await?;
                Ok(Self::failed_summary(run_started))
            }
        }
    }

    fn failed_summary(run_started: Instant) -> InboundRunSummary {
        InboundRunSummary {
            status: SyncStatus::Failed,
            records_processed: 0,
            records_succeeded: 0,
            records_failed: 0,
            duration_ms: run_started.elapsed().as_millis() as i64,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    async fn log_run_failure(
        &self,
        started_at: &str,
        run_started: Instant,
        message: String,
    ) -> Result<()> {
        self.deps
            .logs
            .append(NewSyncLogEntry {
                entity_type: EntityType::All,
                external_version: None,
                records_processed: 0,
                records_succeeded: 0,
                records_failed: 0,
                status: SyncStatus::Failed,
                error_message: Some(message),
                started_at: started_at.to_string(),
                completed_at: Utc::now().to_rfc3339(),
                duration_ms: run_started.elapsed().as_millis() as i64,
            })
            .await?;
        Ok(())
    }

    async fn pull_and_apply(
        &self,
        run_started: Instant,
    ) -> std::result::Result<InboundRunSummary, PullError> {
        let session = self.deps.api.ensure_session().await?;

        let request = GetAllDataRequest {
            product_group_version: self.deps.cursors.get(EntityType::ProductCategory)?,
            product_version: self.deps.cursors.get(EntityType::Product)?,
            product_detail_version: self.deps.cursors.get(EntityType::ProductDetail)?,
            store_asset_version: self.deps.cursors.get(EntityType::Inventory)?,
            picture_version: self.deps.cursors.get(EntityType::ProductImage)?,
            person_version: self.deps.cursors.get(EntityType::Person)?,
        };

        let response = self.deps.api.get_all_data(&session, request).await?;
        if response.is_empty() {
            debug!("Inbound sync: no changes upstream");
            return Ok(InboundRunSummary {
                status: SyncStatus::Success,
                records_processed: 0,
                records_succeeded: 0,
                records_failed: 0,
                duration_ms: run_started.elapsed().as_millis() as i64,
            });
        }

        let mut totals = BatchStats::default();
        for entity_type in INBOUND_STAGE_ORDER {
            if self.is_cancelled() {
                warn!("Inbound sync cancelled before {:?} stage", entity_type);
                break;
            }
            if let Some(stats) = self.apply_stage(entity_type, &response).await? {
                totals.processed += stats.processed;
                totals.succeeded += stats.succeeded;
                totals.failed += stats.failed;
                totals.skipped += stats.skipped;
            }
        }

        Ok(InboundRunSummary {
            status: if totals.failed == 0 {
                SyncStatus::Success
            } else {
                SyncStatus::Failed
            },
            records_processed: totals.processed,
            records_succeeded: totals.succeeded,
            records_failed: totals.failed,
            duration_ms: run_started.elapsed().as_millis() as i64,
        })
    }

    /// Apply one stage's batch and append its audit row. Returns `None` when
    /// the response carried nothing for this stage.
    async fn apply_stage(
        &self,
        entity_type: EntityType,
        response: &GetAllDataResponse,
    ) -> Result<Option<BatchStats>> {
        let stage_started = Instant::now();
        let started_at = Utc::now().to_rfc3339();

        let batch = match entity_type {
            EntityType::ProductCategory => {
                self.apply_categories(response.product_groups.as_deref()).await
            }
            EntityType::Product => self.apply_products(response.products.as_deref()).await,
            EntityType::ProductDetail => {
                self.apply_details(response.product_details.as_deref()).await
            }
            EntityType::Inventory => self.apply_inventory(response.store_assets.as_deref()).await,
            EntityType::ProductImage => self.apply_pictures(response.new_pictures.as_deref()).await,
            EntityType::Person => self.apply_persons(response.persons.as_deref()).await,
            EntityType::Order | EntityType::All => return Ok(None),
        };

        let Some((stats, max_version)) = batch else {
            return Ok(None);
        };

        let status = if stats.failed == 0 {
            SyncStatus::Success
        } else {
            SyncStatus::Failed
        };
        debug!(
            "Inbound stage {:?}: {} processed, {} failed, version {:?}",
            entity_type, stats.processed, stats.failed, max_version
        );

        self.deps
            .logs
            .append(NewSyncLogEntry {
                entity_type,
                external_version: max_version,
                records_processed: stats.processed,
                records_succeeded: stats.succeeded,
                records_failed: stats.failed,
                status,
                error_message: None,
                started_at,
                completed_at: Utc::now().to_rfc3339(),
                duration_ms: stage_started.elapsed().as_millis() as i64,
            })
            .await?;

        Ok(Some(stats))
    }

    async fn apply_categories(
        &self,
        groups: Option<&[ErpProductGroup]>,
    ) -> Option<(BatchStats, Option<i64>)> {
        let groups = groups.filter(|batch| !batch.is_empty())?;
        let mut stats = BatchStats::default();
        let mut max_version = None;

        for group in groups {
            // A batch cut short never logs or advances the cursor; applied
            // records stay applied and the window is re-pulled next run.
            if self.is_cancelled() {
                return None;
            }
            max_version = max_version.max(Some(group.row_version));
            let outcome = self
                .apply_category(group)
                .await
                .unwrap_or_else(|err| ApplyOutcome::Failed(err.to_string()));
            if let ApplyOutcome::Failed(reason) = &outcome {
                warn!("Category {} failed: {}", group.code, reason);
            }
            stats.record(&outcome);
        }
        Some((stats, max_version))
    }

    async fn apply_category(&self, group: &ErpProductGroup) -> Result<ApplyOutcome> {
        let existing = self
            .deps
            .mappings
            .find_by_external(EntityType::ProductCategory, group.code)?;

        if group.is_deleted {
            if let Some(mapping) = existing {
                self.deps
                    .mappings
                    .unmap(mapping.id, "deleted upstream".to_string())
                    .await?;
            }
            return Ok(ApplyOutcome::Skipped("deleted upstream".to_string()));
        }

        let Some(name) = group
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            return Ok(ApplyOutcome::Failed(format!(
                "category {} has no name",
                group.code
            )));
        };

        match existing {
            Some(mapping) => {
                self.deps
                    .categories
                    .rename(mapping.local_id, name.to_string())
                    .await?;
                Ok(ApplyOutcome::Applied)
            }
            None => {
                let category = self
                    .deps
                    .categories
                    .insert(NewProductCategory {
                        name: name.to_string(),
                    })
                    .await?;
                self.create_mapping(EntityType::ProductCategory, category.id, group.code)
                    .await
            }
        }
    }

    async fn apply_products(
        &self,
        products: Option<&[ErpProduct]>,
    ) -> Option<(BatchStats, Option<i64>)> {
        let products = products.filter(|batch| !batch.is_empty())?;
        let mut stats = BatchStats::default();
        let mut max_version = None;

        for product in products {
            if self.is_cancelled() {
                return None;
            }
            max_version = max_version.max(Some(product.row_version));
            let outcome = self
                .apply_product(product)
                .await
                .unwrap_or_else(|err| ApplyOutcome::Failed(err.to_string()));
            if let ApplyOutcome::Failed(reason) = &outcome {
                warn!("Product {} failed: {}", product.code, reason);
            }
            stats.record(&outcome);
        }
        Some((stats, max_version))
    }

    async fn apply_product(&self, product: &ErpProduct) -> Result<ApplyOutcome> {
        let existing = self
            .deps
            .mappings
            .find_by_external(EntityType::Product, product.code)?;

        if product.is_deleted {
            if let Some(mapping) = existing {
                self.deps
                    .mappings
                    .unmap(mapping.id, "deleted upstream".to_string())
                    .await?;
            }
            return Ok(ApplyOutcome::Skipped("deleted upstream".to_string()));
        }

        let Some(name) = product
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            return Ok(ApplyOutcome::Failed(format!(
                "product {} has no name",
                product.code
            )));
        };

        // An unmapped group leaves the product uncategorized rather than
        // failing it; the category may arrive in a later batch.
        let category_id = match product.group_code {
            Some(group_code) => self
                .deps
                .mappings
                .find_by_external(EntityType::ProductCategory, group_code)?
                .map(|mapping| mapping.local_id),
            None => None,
        };

        match existing {
            Some(mapping) => {
                self.deps
                    .products
                    .update_catalog_fields(
                        mapping.local_id,
                        name.to_string(),
                        product.description.clone(),
                        category_id,
                    )
                    .await?;
                Ok(ApplyOutcome::Applied)
            }
            None => {
                let created = self
                    .deps
                    .products
                    .insert(NewProduct {
                        name: name.to_string(),
                        description: product.description.clone(),
                        category_id,
                        // Pricing arrives with the product-detail stage.
                        price: Decimal::ZERO,
                    })
                    .await?;
                self.create_mapping(EntityType::Product, created.id, product.code)
                    .await
            }
        }
    }

    async fn apply_details(
        &self,
        details: Option<&[ErpProductDetail]>,
    ) -> Option<(BatchStats, Option<i64>)> {
        let details = details.filter(|batch| !batch.is_empty())?;
        let mut stats = BatchStats::default();
        let mut max_version = None;

        for detail in details {
            if self.is_cancelled() {
                return None;
            }
            max_version = max_version.max(Some(detail.row_version));
            let outcome = self
                .apply_detail(detail)
                .await
                .unwrap_or_else(|err| ApplyOutcome::Failed(err.to_string()));
            if let ApplyOutcome::Failed(reason) = &outcome {
                warn!("Product detail {} failed: {}", detail.code, reason);
            }
            stats.record(&outcome);
        }
        Some((stats, max_version))
    }

    async fn apply_detail(&self, detail: &ErpProductDetail) -> Result<ApplyOutcome> {
        if detail.is_deleted {
            return Ok(ApplyOutcome::Skipped("deleted upstream".to_string()));
        }

        let Some(mapping) = self
            .deps
            .mappings
            .find_by_external(EntityType::Product, detail.product_code)?
        else {
            return Ok(ApplyOutcome::Failed(format!(
                "product {} not mapped",
                detail.product_code
            )));
        };

        let price = resolve_list_price(detail.default_price_no, &detail.price_tiers());
        self.deps
            .products
            .update_pricing(mapping.local_id, price, detail.barcode.clone())
            .await?;
        Ok(ApplyOutcome::Applied)
    }

    async fn apply_inventory(
        &self,
        assets: Option<&[ErpStoreAsset]>,
    ) -> Option<(BatchStats, Option<i64>)> {
        let assets = assets.filter(|batch| !batch.is_empty())?;
        let mut stats = BatchStats::default();
        let mut max_version = None;

        // Quantities are carried per variant; the store tracks one figure
        // per product. A deleted variant still forces a recount so a product
        // whose last variant vanished drops to zero.
        let mut totals: BTreeMap<i64, Decimal> = BTreeMap::new();
        for asset in assets {
            max_version = max_version.max(Some(asset.row_version));
            let entry = totals.entry(asset.product_code).or_default();
            if !asset.is_deleted {
                *entry += asset.count;
            }
        }

        for (product_code, total) in totals {
            if self.is_cancelled() {
                return None;
            }
            let outcome = self
                .apply_stock(product_code, total)
                .await
                .unwrap_or_else(|err| ApplyOutcome::Failed(err.to_string()));
            if let ApplyOutcome::Failed(reason) = &outcome {
                warn!("Inventory for product {} failed: {}", product_code, reason);
            }
            stats.record(&outcome);
        }
        Some((stats, max_version))
    }

    async fn apply_stock(&self, product_code: i64, total: Decimal) -> Result<ApplyOutcome> {
        let Some(mapping) = self
            .deps
            .mappings
            .find_by_external(EntityType::Product, product_code)?
        else {
            return Ok(ApplyOutcome::Failed(format!(
                "product {} not mapped",
                product_code
            )));
        };

        // Summed variant counts can exceed i32; saturate rather than zero a
        // well-stocked product.
        let quantity = total.trunc().to_i32().unwrap_or(if total.is_sign_positive() {
            i32::MAX
        } else {
            i32::MIN
        });
        self.deps
            .products
            .set_available_stock(mapping.local_id, quantity)
            .await?;
        Ok(ApplyOutcome::Applied)
    }

    async fn apply_pictures(
        &self,
        pictures: Option<&[ErpNewPicture]>,
    ) -> Option<(BatchStats, Option<i64>)> {
        let pictures = pictures.filter(|batch| !batch.is_empty())?;
        let mut stats = BatchStats::default();
        let mut max_version = None;

        for picture in pictures {
            if self.is_cancelled() {
                return None;
            }
            max_version = max_version.max(Some(picture.row_version));
            let outcome = self
                .apply_picture(picture)
                .await
                .unwrap_or_else(|err| ApplyOutcome::Failed(err.to_string()));
            if let ApplyOutcome::Failed(reason) = &outcome {
                warn!("Picture for entity {} failed: {}", picture.entity_code, reason);
            }
            stats.record(&outcome);
        }
        Some((stats, max_version))
    }

    async fn apply_picture(&self, picture: &ErpNewPicture) -> Result<ApplyOutcome> {
        if !picture.is_product_picture() {
            return Ok(ApplyOutcome::Skipped("not a product picture".to_string()));
        }
        if picture.is_deleted {
            return Ok(ApplyOutcome::Skipped("deleted upstream".to_string()));
        }

        let Some(mapping) = self
            .deps
            .mappings
            .find_by_external(EntityType::Product, picture.entity_code)?
        else {
            return Ok(ApplyOutcome::Failed(format!(
                "product {} not mapped",
                picture.entity_code
            )));
        };

        let existing = self.deps.images.list_for_product(&mapping.local_id)?;
        if existing.iter().any(|image| image.url == picture.url) {
            return Ok(ApplyOutcome::Skipped("image url already attached".to_string()));
        }

        let insert = self
            .deps
            .images
            .insert(NewProductImage {
                product_id: mapping.local_id,
                url: picture.url.clone(),
                // The first image a product ever receives becomes primary.
                is_primary: existing.is_empty(),
            })
            .await;
        match insert {
            Ok(_) => Ok(ApplyOutcome::Applied),
            Err(err) if err.is_unique_violation() => Ok(ApplyOutcome::Skipped(
                "image url already attached".to_string(),
            )),
            Err(err) => Err(err),
        }
    }

    async fn apply_persons(
        &self,
        persons: Option<&[ErpPerson]>,
    ) -> Option<(BatchStats, Option<i64>)> {
        let persons = persons.filter(|batch| !batch.is_empty())?;
        let mut stats = BatchStats::default();
        let mut max_version = None;

        for person in persons {
            if self.is_cancelled() {
                return None;
            }
            max_version = max_version.max(Some(person.row_version));
            let outcome = self
                .apply_person(person)
                .await
                .unwrap_or_else(|err| ApplyOutcome::Failed(err.to_string()));
            if let ApplyOutcome::Failed(reason) = &outcome {
                warn!("Person {} failed: {}", person.code, reason);
            }
            stats.record(&outcome);
        }
        Some((stats, max_version))
    }

    async fn apply_person(&self, person: &ErpPerson) -> Result<ApplyOutcome> {
        let existing = self
            .deps
            .mappings
            .find_by_external(EntityType::Person, person.code)?;

        if person.is_deleted {
            if let Some(mapping) = existing {
                self.deps
                    .mappings
                    .unmap(mapping.id, "deleted upstream".to_string())
                    .await?;
            }
            return Ok(ApplyOutcome::Skipped("deleted upstream".to_string()));
        }

        if existing.is_some() {
            return Ok(ApplyOutcome::Skipped("person already registered".to_string()));
        }

        // Pre-register a placeholder so a later self-registration can claim
        // this identity instead of creating a duplicate.
        let party = self
            .deps
            .parties
            .insert(NewParty {
                full_name: person.full_name.clone(),
                mobile: person.mobile.clone(),
                is_placeholder: true,
            })
            .await?;
        self.create_mapping(EntityType::Person, party.id, person.code)
            .await
    }

    /// Record a new correspondence. Losing the creation race to a concurrent
    /// writer is benign; the record lands as a skip.
    async fn create_mapping(
        &self,
        entity_type: EntityType,
        local_id: String,
        external_id: i64,
    ) -> Result<ApplyOutcome> {
        let create = self
            .deps
            .mappings
            .create(NewEntityMapping {
                entity_type,
                local_id,
                external_id,
                external_code: Some(external_id.to_string()),
            })
            .await;
        match create {
            Ok(_) => Ok(ApplyOutcome::Applied),
            Err(err) if err.is_unique_violation() => Ok(ApplyOutcome::Skipped(
                "mapping created concurrently".to_string(),
            )),
            Err(err) => Err(err),
        }
    }
}

/// Drains `catalog_pull` retry items by running a full inbound cycle.
pub struct CatalogPullExecutor {
    engine: Arc<InboundSyncEngine>,
}

impl CatalogPullExecutor {
    pub fn new(engine: Arc<InboundSyncEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl RetryExecutor for CatalogPullExecutor {
    fn operation(&self) -> RetryOperation {
        RetryOperation::CatalogPull
    }

    async fn execute(&self, _item: &RetryQueueItem) -> Result<Option<String>> {
        let summary = self.engine.run().await?;
        // The engine swallows run failures into the summary; surface them
        // here so the drainer reschedules the item.
        if summary.status == SyncStatus::Failed {
            return Err(Error::Unexpected(
                "catalog pull failed; see the sync log".to_string(),
            ));
        }
        Ok(Some(serde_json::to_string(&summary)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::Harness;
    use rust_decimal_macros::dec;
    use shoplink_core::sync::RetryStatus;

    fn group(code: i64, name: &str, row_version: i64) -> ErpProductGroup {
        ErpProductGroup {
            code,
            name: Some(name.to_string()),
            row_version,
            is_deleted: false,
        }
    }

    fn product(code: i64, name: &str, group_code: Option<i64>, row_version: i64) -> ErpProduct {
        ErpProduct {
            code,
            name: Some(name.to_string()),
            description: None,
            group_code,
            row_version,
            is_deleted: false,
        }
    }

    fn detail(product_code: i64, price1: Option<Decimal>, row_version: i64) -> ErpProductDetail {
        ErpProductDetail {
            code: product_code * 10,
            product_code,
            price1,
            price2: None,
            price3: None,
            default_price_no: 1,
            barcode: None,
            row_version,
            is_deleted: false,
        }
    }

    fn asset(product_code: i64, count: Decimal, row_version: i64) -> ErpStoreAsset {
        ErpStoreAsset {
            product_detail_code: product_code * 10,
            product_code,
            count,
            row_version,
            is_deleted: false,
        }
    }

    fn picture(entity_code: i64, url: &str, row_version: i64) -> ErpNewPicture {
        ErpNewPicture {
            entity_kind: ErpNewPicture::PRODUCT_KIND.to_string(),
            entity_code,
            url: url.to_string(),
            row_version,
            is_deleted: false,
        }
    }

    fn person(code: i64, name: &str, row_version: i64) -> ErpPerson {
        ErpPerson {
            code,
            full_name: Some(name.to_string()),
            mobile: Some("5551234".to_string()),
            row_version,
            is_deleted: false,
        }
    }

    #[tokio::test]
    async fn full_pull_builds_the_catalog_in_dependency_order() {
        let harness = Harness::new();
        harness.api.script_pull(GetAllDataResponse {
            product_groups: Some(vec![group(10, "Drinks", 3)]),
            products: Some(vec![product(100, "Cola", Some(10), 7)]),
            product_details: Some(vec![ErpProductDetail {
                price2: Some(dec!(4.00)),
                default_price_no: 2,
                barcode: Some("890123".to_string()),
                ..detail(100, Some(dec!(5.00)), 11)
            }]),
            store_assets: Some(vec![
                asset(100, dec!(3), 13),
                asset(100, dec!(2), 14),
            ]),
            new_pictures: Some(vec![picture(100, "https://erp.example/p/100.jpg", 17)]),
            persons: Some(vec![person(200, "Jordan Smith", 19)]),
        });

        let engine = harness.inbound();
        let summary = engine.run().await.unwrap();
        assert_eq!(summary.status, SyncStatus::Success);
        assert_eq!(summary.records_failed, 0);

        // Category landed and the product points at it.
        let category_mapping = harness
            .mappings
            .find_by_external(EntityType::ProductCategory, 10)
            .unwrap()
            .expect("category mapped");
        let product_mapping = harness
            .mappings
            .find_by_external(EntityType::Product, 100)
            .unwrap()
            .expect("product mapped");
        let stored = harness.products.by_id(&product_mapping.local_id).unwrap();
        assert_eq!(stored.category_id.as_deref(), Some(category_mapping.local_id.as_str()));

        // Enrichment stages: chosen tier 2 price, barcode, summed stock.
        assert_eq!(stored.price, dec!(4.00));
        assert_eq!(stored.barcode.as_deref(), Some("890123"));
        assert_eq!(stored.available_stock, 5);

        // First image is primary; person landed as a placeholder.
        let images = harness.images.list_for_product(&product_mapping.local_id).unwrap();
        assert_eq!(images.len(), 1);
        assert!(images[0].is_primary);
        let parties = harness.parties.rows.lock().unwrap().clone();
        assert_eq!(parties.len(), 1);
        assert!(parties[0].is_placeholder);

        // Every stage appended a successful audit row and moved its cursor.
        assert_eq!(harness.cursors.get(EntityType::ProductCategory).unwrap(), 3);
        assert_eq!(harness.cursors.get(EntityType::Product).unwrap(), 7);
        assert_eq!(harness.cursors.get(EntityType::ProductDetail).unwrap(), 11);
        assert_eq!(harness.cursors.get(EntityType::Inventory).unwrap(), 14);
        assert_eq!(harness.cursors.get(EntityType::ProductImage).unwrap(), 17);
        assert_eq!(harness.cursors.get(EntityType::Person).unwrap(), 19);
    }

    #[tokio::test]
    async fn replaying_an_identical_pull_creates_nothing_new() {
        let harness = Harness::new();
        let response = GetAllDataResponse {
            product_groups: Some(vec![group(10, "Drinks", 3)]),
            products: Some(vec![product(100, "Cola", Some(10), 7)]),
            product_details: Some(vec![detail(100, Some(dec!(5.00)), 11)]),
            store_assets: Some(vec![asset(100, dec!(4), 13)]),
            new_pictures: Some(vec![picture(100, "https://erp.example/p/100.jpg", 17)]),
            persons: Some(vec![person(200, "Jordan Smith", 19)]),
        };
        harness.api.script_pull(response.clone());
        harness.api.script_pull(response);

        let engine = harness.inbound();
        engine.run().await.unwrap();
        let mappings = harness.mappings.rows.lock().unwrap().len();
        let categories = harness.categories.rows.lock().unwrap().len();
        let products = harness.products.rows.lock().unwrap().len();
        let images = harness.images.rows.lock().unwrap().len();
        let parties = harness.parties.rows.lock().unwrap().len();

        // Re-absorbing the same window is a pure no-op: updates land in
        // place, nothing is duplicated.
        let summary = engine.run().await.unwrap();
        assert_eq!(summary.status, SyncStatus::Success);
        assert_eq!(summary.records_failed, 0);

        assert_eq!(harness.mappings.rows.lock().unwrap().len(), mappings);
        assert_eq!(harness.categories.rows.lock().unwrap().len(), categories);
        assert_eq!(harness.products.rows.lock().unwrap().len(), products);
        assert_eq!(harness.images.rows.lock().unwrap().len(), images);
        assert_eq!(harness.parties.rows.lock().unwrap().len(), parties);
    }

    #[tokio::test]
    async fn pull_request_carries_current_cursors_and_empty_response_is_a_noop() {
        let harness = Harness::new();
        harness.cursors.set(EntityType::ProductCategory, 3);
        harness.cursors.set(EntityType::Product, 7);
        harness.cursors.set(EntityType::Inventory, 14);
        harness.api.script_pull(GetAllDataResponse::default());

        let summary = harness.inbound().run().await.unwrap();
        assert_eq!(summary.status, SyncStatus::Success);
        assert_eq!(summary.records_processed, 0);

        let requests = harness.api.pull_requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].product_group_version, 3);
        assert_eq!(requests[0].product_version, 7);
        assert_eq!(requests[0].store_asset_version, 14);
        assert_eq!(requests[0].person_version, 0);

        // No changes, no audit rows.
        assert!(harness.logs.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_bad_record_never_blocks_its_siblings() {
        let harness = Harness::new();
        harness.api.script_pull(GetAllDataResponse {
            product_groups: Some(vec![
                ErpProductGroup {
                    name: None,
                    ..group(10, "", 5)
                },
                group(11, "Snacks", 6),
            ]),
            ..Default::default()
        });

        let summary = harness.inbound().run().await.unwrap();
        assert_eq!(summary.status, SyncStatus::Failed);
        assert_eq!(summary.records_processed, 2);
        assert_eq!(summary.records_succeeded, 1);
        assert_eq!(summary.records_failed, 1);

        // The good sibling landed.
        assert!(harness
            .mappings
            .find_by_external(EntityType::ProductCategory, 11)
            .unwrap()
            .is_some());

        // A failed stage never advances the watermark, so the bad record is
        // retried next run.
        let entries = harness.logs.entries_for(EntityType::ProductCategory);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, SyncStatus::Failed);
        assert_eq!(harness.cursors.get(EntityType::ProductCategory).unwrap(), 0);
    }

    #[tokio::test]
    async fn upstream_deletion_unmaps_and_skips() {
        let harness = Harness::new();
        harness
            .mappings
            .seed(EntityType::ProductCategory, "cat-local", 10);
        harness.api.script_pull(GetAllDataResponse {
            product_groups: Some(vec![ErpProductGroup {
                is_deleted: true,
                ..group(10, "Drinks", 8)
            }]),
            ..Default::default()
        });

        let summary = harness.inbound().run().await.unwrap();
        assert_eq!(summary.status, SyncStatus::Success);

        assert!(harness
            .mappings
            .find_by_external(EntityType::ProductCategory, 10)
            .unwrap()
            .is_none());
        let rows = harness.mappings.rows.lock().unwrap().clone();
        assert_eq!(rows[0].unmapped_reason.as_deref(), Some("deleted upstream"));

        // Skips still count as absorbed; the cursor moves past the deletion.
        assert_eq!(harness.cursors.get(EntityType::ProductCategory).unwrap(), 8);
    }

    #[tokio::test]
    async fn zero_price_tier_falls_back_to_tier_one() {
        let harness = Harness::new();
        let stored = harness
            .products
            .insert(NewProduct {
                name: "Cola".to_string(),
                description: None,
                category_id: None,
                price: Decimal::ZERO,
            })
            .await
            .unwrap();
        harness.mappings.seed(EntityType::Product, &stored.id, 100);

        harness.api.script_pull(GetAllDataResponse {
            product_details: Some(vec![ErpProductDetail {
                price3: Some(dec!(0)),
                default_price_no: 3,
                ..detail(100, Some(dec!(100)), 11)
            }]),
            ..Default::default()
        });

        harness.inbound().run().await.unwrap();
        assert_eq!(harness.products.by_id(&stored.id).unwrap().price, dec!(100));
    }

    #[tokio::test]
    async fn deleted_variant_still_forces_a_stock_recount() {
        let harness = Harness::new();
        let stored = harness
            .products
            .insert(NewProduct {
                name: "Cola".to_string(),
                description: None,
                category_id: None,
                price: Decimal::ZERO,
            })
            .await
            .unwrap();
        harness
            .products
            .set_available_stock(stored.id.clone(), 9)
            .await
            .unwrap();
        harness.mappings.seed(EntityType::Product, &stored.id, 100);

        harness.api.script_pull(GetAllDataResponse {
            store_assets: Some(vec![ErpStoreAsset {
                is_deleted: true,
                ..asset(100, dec!(9), 21)
            }]),
            ..Default::default()
        });

        harness.inbound().run().await.unwrap();
        assert_eq!(harness.products.by_id(&stored.id).unwrap().available_stock, 0);
    }

    #[tokio::test]
    async fn stock_beyond_the_i32_range_saturates() {
        let harness = Harness::new();
        let stored = harness
            .products
            .insert(NewProduct {
                name: "Cola".to_string(),
                description: None,
                category_id: None,
                price: Decimal::ZERO,
            })
            .await
            .unwrap();
        harness.mappings.seed(EntityType::Product, &stored.id, 100);

        harness.api.script_pull(GetAllDataResponse {
            store_assets: Some(vec![asset(100, dec!(3000000000), 21)]),
            ..Default::default()
        });

        let summary = harness.inbound().run().await.unwrap();
        assert_eq!(summary.status, SyncStatus::Success);
        assert_eq!(
            harness.products.by_id(&stored.id).unwrap().available_stock,
            i32::MAX
        );
    }

    #[tokio::test]
    async fn pictures_are_filtered_deduplicated_and_first_is_primary() {
        let harness = Harness::new();
        let stored = harness
            .products
            .insert(NewProduct {
                name: "Cola".to_string(),
                description: None,
                category_id: None,
                price: Decimal::ZERO,
            })
            .await
            .unwrap();
        harness.mappings.seed(EntityType::Product, &stored.id, 100);

        harness.api.script_pull(GetAllDataResponse {
            new_pictures: Some(vec![
                ErpNewPicture {
                    entity_kind: "Invoice".to_string(),
                    ..picture(100, "https://erp.example/i/1.jpg", 30)
                },
                picture(100, "https://erp.example/p/front.jpg", 31),
                picture(100, "https://erp.example/p/front.jpg", 32),
                picture(100, "https://erp.example/p/back.jpg", 33),
            ]),
            ..Default::default()
        });

        let summary = harness.inbound().run().await.unwrap();
        assert_eq!(summary.status, SyncStatus::Success);

        let images = harness.images.list_for_product(&stored.id).unwrap();
        assert_eq!(images.len(), 2);
        assert!(images[0].is_primary);
        assert!(!images[1].is_primary);

        let entries = harness.logs.entries_for(EntityType::ProductImage);
        assert_eq!(entries[0].records_processed, 4);
        assert_eq!(entries[0].records_succeeded, 4);
    }

    #[tokio::test]
    async fn already_registered_person_is_skipped() {
        let harness = Harness::new();
        harness.mappings.seed(EntityType::Person, "party-existing", 200);
        harness.api.script_pull(GetAllDataResponse {
            persons: Some(vec![person(200, "Jordan Smith", 40)]),
            ..Default::default()
        });

        let summary = harness.inbound().run().await.unwrap();
        assert_eq!(summary.status, SyncStatus::Success);
        assert!(harness.parties.rows.lock().unwrap().is_empty());
        assert_eq!(harness.cursors.get(EntityType::Person).unwrap(), 40);
    }

    #[tokio::test]
    async fn auth_failure_invalidates_the_session_and_logs_the_run() {
        let harness = Harness::new();
        harness.api.fail_login(401, "token expired");

        let summary = harness.inbound().run().await.unwrap();
        assert_eq!(summary.status, SyncStatus::Failed);
        assert_eq!(summary.records_processed, 0);
        assert_eq!(harness.api.invalidation_count(), 1);

        let entries = harness.logs.entries_for(EntityType::All);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, SyncStatus::Failed);
        assert!(entries[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("token expired"));

        // A plain run never enqueues retries.
        assert!(harness.retry_queue.items.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn scheduled_run_enqueues_a_catalog_pull_retry_on_transient_failure() {
        let harness = Harness::new();
        harness.api.script_pull_error(503, "maintenance window");

        let summary = harness.inbound().run_scheduled().await.unwrap();
        assert_eq!(summary.status, SyncStatus::Failed);

        let items = harness.retry_queue.items.lock().unwrap().clone();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].operation, RetryOperation::CatalogPull);
        assert_eq!(items[0].status, RetryStatus::Pending);
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_stage() {
        let harness = Harness::new();
        harness.api.script_pull(GetAllDataResponse {
            product_groups: Some(vec![group(10, "Drinks", 3)]),
            ..Default::default()
        });

        let engine = harness.inbound();
        engine.cancellation_flag().store(true, Ordering::Relaxed);

        let summary = engine.run().await.unwrap();
        assert_eq!(summary.records_processed, 0);
        assert!(harness.logs.entries.lock().unwrap().is_empty());
        assert!(harness.categories.rows.lock().unwrap().is_empty());
    }
}
