//! Outbound order push: every paid order without an external identity is
//! submitted, one at a time, with per-order failure isolation.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::Mutex;

use shoplink_core::errors::Result;
use shoplink_core::orders::Order;
use shoplink_core::repositories::{
    MappingRepositoryTrait, OrderRepositoryTrait, RetryQueueRepositoryTrait,
    SyncLogRepositoryTrait,
};
use shoplink_core::sync::{
    order_surrogate_id, EntityType, NewRetryQueueItem, NewSyncLogEntry, OutboundRunSummary,
    RetryOperation, RetryQueueItem, SyncStatus, DEFAULT_MAX_ATTEMPTS,
};
use shoplink_erp_client::{
    ErpOrderHeader, ErpOrderLine, ErpRetryClass, SaveOrderRequest, SessionToken,
};

use crate::api::{erp_error, ErpApi};
use crate::retry::RetryExecutor;

pub struct OutboundSyncEngine {
    api: Arc<dyn ErpApi>,
    mappings: Arc<dyn MappingRepositoryTrait>,
    orders: Arc<dyn OrderRepositoryTrait>,
    retry_queue: Arc<dyn RetryQueueRepositoryTrait>,
    logs: Arc<dyn SyncLogRepositoryTrait>,
    cycle_mutex: Mutex<()>,
}

impl OutboundSyncEngine {
    pub fn new(
        api: Arc<dyn ErpApi>,
        mappings: Arc<dyn MappingRepositoryTrait>,
        orders: Arc<dyn OrderRepositoryTrait>,
        retry_queue: Arc<dyn RetryQueueRepositoryTrait>,
        logs: Arc<dyn SyncLogRepositoryTrait>,
    ) -> Self {
        Self {
            api,
            mappings,
            orders,
            retry_queue,
            logs,
            cycle_mutex: Mutex::new(()),
        }
    }

    /// Push every order awaiting submission. A failed order is recorded and
    /// skipped; it never blocks its siblings.
    ///
    /// Runs are fire-and-forget: whatever stops a run wholesale is logged
    /// and the run exits cleanly; the next scheduled invocation retries
    /// from scratch.
    pub async fn run(&self) -> Result<OutboundRunSummary> {
        let _guard = self.cycle_mutex.lock().await;
        let run_started = Instant::now();
        let started_at = Utc::now().to_rfc3339();

        match self.push_pending(&started_at, run_started).await {
            Ok(summary) => Ok(summary),
            Err(err) => {
                error!("Outbound sync aborted: {}", err);
                self.log_run(&started_at, run_started, 0, 0, Some(err.to_string()))
                    .await?;
                Ok(OutboundRunSummary::default())
            }
        }
    }

    async fn push_pending(
        &self,
        started_at: &str,
        run_started: Instant,
    ) -> Result<OutboundRunSummary> {
        let pending = self.orders.list_awaiting_push()?;
        if pending.is_empty() {
            debug!("Outbound sync: nothing to push");
            return Ok(OutboundRunSummary::default());
        }
        info!("Outbound sync: {} order(s) awaiting push", pending.len());

        let session = match self.api.ensure_session().await {
            Ok(session) => session,
            Err(err) => {
                error!("Outbound sync aborted: {}", err);
                if err.retry_class() == ErpRetryClass::ReauthRequired {
                    self.api.invalidate_session().await;
                }
                self.log_run(started_at, run_started, 0, 0, Some(err.to_string()))
                    .await?;
                return Ok(OutboundRunSummary::default());
            }
        };

        let mut summary = OutboundRunSummary::default();
        for order in pending {
            match self.push_order(&session, &order, &mut summary).await {
                Ok(PushControl::Continue) => {}
                Ok(PushControl::StopRun) => break,
                Err(err) => {
                    // push_order bumps submitted/failed only on its way out,
                    // so an order aborted by a storage error is counted
                    // exactly once here. The rest of the batch still runs.
                    error!("Order {} push hit a local failure: {}", order.id, err);
                    summary.failed += 1;
                }
            }
        }

        self.log_run(
            started_at,
            run_started,
            summary.submitted,
            summary.failed,
            None,
        )
        .await?;
        Ok(summary)
    }

    async fn push_order(
        &self,
        session: &SessionToken,
        order: &Order,
        summary: &mut OutboundRunSummary,
    ) -> Result<PushControl> {
        let request = match self.build_request(order, summary)? {
            Some(request) => request,
            None => {
                // No resolvable lines: a permanent condition, not worth a
                // retry item.
                self.orders
                    .mark_sync_error(order.id.clone(), "no pushable lines".to_string())
                    .await?;
                summary.failed += 1;
                return Ok(PushControl::Continue);
            }
        };

        match self.api.save_order(session, request.clone()).await {
            Ok(response) => {
                self.orders
                    .mark_synced(order.id.clone(), response.client_order_id)
                    .await?;
                summary.submitted += 1;
                Ok(PushControl::Continue)
            }
            Err(err) => {
                warn!("Order {} push failed: {}", order.id, err);
                self.orders
                    .mark_sync_error(order.id.clone(), err.to_string())
                    .await?;
                let control = match err.retry_class() {
                    ErpRetryClass::Retryable => {
                        self.enqueue_retry(order, &request).await?;
                        PushControl::Continue
                    }
                    ErpRetryClass::ReauthRequired => {
                        // The token is dead; nothing else will go through
                        // this run.
                        self.api.invalidate_session().await;
                        PushControl::StopRun
                    }
                    ErpRetryClass::Permanent => PushControl::Continue,
                };
                summary.failed += 1;
                Ok(control)
            }
        }
    }

    /// Resolve the order's lines into the wire shape. Lines whose product
    /// has no external mapping are dropped with a warning; `None` means no
    /// line survived.
    fn build_request(
        &self,
        order: &Order,
        summary: &mut OutboundRunSummary,
    ) -> Result<Option<SaveOrderRequest>> {
        let mut lines = Vec::new();
        for line in self.orders.lines_for(&order.id)? {
            let Some(mapping) = self
                .mappings
                .find_by_local(EntityType::Product, &line.product_id)?
            else {
                warn!(
                    "Order {}: product {} has no external mapping, line skipped",
                    order.id, line.product_id
                );
                summary.skipped_lines += 1;
                continue;
            };
            lines.push(ErpOrderLine {
                product_code: mapping.external_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        if lines.is_empty() {
            return Ok(None);
        }

        Ok(Some(SaveOrderRequest {
            order: ErpOrderHeader {
                client_order_id: order_surrogate_id(&order.id),
                discount_amount: order.discount_amount,
                shipping_amount: order.shipping_amount,
                is_settled: order.is_paid,
            },
            lines,
        }))
    }

    async fn enqueue_retry(&self, order: &Order, request: &SaveOrderRequest) -> Result<()> {
        self.retry_queue
            .enqueue(NewRetryQueueItem {
                operation: RetryOperation::OrderPush,
                entity_type: EntityType::Order,
                entity_id: order.id.clone(),
                priority: 100,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                payload: serde_json::to_string(request)?,
            })
            .await?;
        Ok(())
    }

    async fn log_run(
        &self,
        started_at: &str,
        run_started: Instant,
        submitted: i32,
        failed: i32,
        error_message: Option<String>,
    ) -> Result<()> {
        let status = if failed == 0 && error_message.is_none() {
            SyncStatus::Success
        } else {
            SyncStatus::Failed
        };
        self.logs
            .append(NewSyncLogEntry {
                entity_type: EntityType::Order,
                external_version: None,
                records_processed: submitted + failed,
                records_succeeded: submitted,
                records_failed: failed,
                status,
                error_message,
                started_at: started_at.to_string(),
                completed_at: Utc::now().to_rfc3339(),
                duration_ms: run_started.elapsed().as_millis() as i64,
            })
            .await?;
        Ok(())
    }
}

enum PushControl {
    Continue,
    StopRun,
}

/// Drains `order_push` retry items by replaying the stored request. The
/// deterministic surrogate id makes the replay idempotent on the ERP side.
pub struct OrderPushExecutor {
    api: Arc<dyn ErpApi>,
    orders: Arc<dyn OrderRepositoryTrait>,
}

impl OrderPushExecutor {
    pub fn new(api: Arc<dyn ErpApi>, orders: Arc<dyn OrderRepositoryTrait>) -> Self {
        Self { api, orders }
    }
}

#[async_trait]
impl RetryExecutor for OrderPushExecutor {
    fn operation(&self) -> RetryOperation {
        RetryOperation::OrderPush
    }

    async fn execute(&self, item: &RetryQueueItem) -> Result<Option<String>> {
        let request: SaveOrderRequest = serde_json::from_str(&item.payload)?;

        let session = self
            .api
            .ensure_session()
            .await
            .map_err(|err| erp_error(&err))?;
        let response = match self.api.save_order(&session, request).await {
            Ok(response) => response,
            Err(err) => {
                if err.retry_class() == ErpRetryClass::ReauthRequired {
                    self.api.invalidate_session().await;
                }
                return Err(erp_error(&err));
            }
        };

        self.orders
            .mark_synced(item.entity_id.clone(), response.client_order_id)
            .await?;
        Ok(Some(serde_json::to_string(&response)?))
    }
}
