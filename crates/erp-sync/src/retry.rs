//! Retry queue drain loop: due items are dispatched to their operation's
//! executor, rescheduled with backoff on failure, and dead-lettered when the
//! attempt budget runs out.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{debug, info, warn};

use shoplink_core::errors::Result;
use shoplink_core::repositories::RetryQueueRepositoryTrait;
use shoplink_core::sync::{
    backoff_seconds_with_jitter, RetryOperation, RetryQueueItem, RetryStatus,
    RETRY_DRAIN_BATCH_SIZE,
};

/// Executes one kind of deferred operation.
#[async_trait]
pub trait RetryExecutor: Send + Sync {
    /// Which queue operation this executor handles.
    fn operation(&self) -> RetryOperation;

    /// Perform the deferred work. A returned string is stored as the item's
    /// response.
    async fn execute(&self, item: &RetryQueueItem) -> Result<Option<String>>;
}

/// Counters for one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub drained: usize,
    pub succeeded: usize,
    pub rescheduled: usize,
    pub dead_lettered: usize,
}

pub struct RetryQueueDrainer {
    queue: Arc<dyn RetryQueueRepositoryTrait>,
    executors: Vec<Arc<dyn RetryExecutor>>,
}

impl RetryQueueDrainer {
    pub fn new(
        queue: Arc<dyn RetryQueueRepositoryTrait>,
        executors: Vec<Arc<dyn RetryExecutor>>,
    ) -> Self {
        Self { queue, executors }
    }

    fn executor_for(&self, operation: RetryOperation) -> Option<&Arc<dyn RetryExecutor>> {
        self.executors
            .iter()
            .find(|executor| executor.operation() == operation)
    }

    /// Process one batch of due items.
    pub async fn drain(&self) -> Result<DrainSummary> {
        let now = Utc::now().to_rfc3339();
        let due = self.queue.due(&now, RETRY_DRAIN_BATCH_SIZE)?;
        if due.is_empty() {
            return Ok(DrainSummary::default());
        }
        debug!("Draining {} retry item(s)", due.len());

        let mut summary = DrainSummary::default();
        for item in due {
            summary.drained += 1;
            self.queue.mark_processing(item.id.clone()).await?;

            let Some(executor) = self.executor_for(item.operation) else {
                // No executor registered counts as an attempt so the item
                // eventually dead-letters instead of spinning forever.
                warn!("No executor for retry operation {:?}", item.operation);
                let status = self
                    .record_failure(&item, "no executor registered".to_string())
                    .await?;
                Self::tally(&mut summary, status);
                continue;
            };

            match executor.execute(&item).await {
                Ok(response) => {
                    self.queue.mark_succeeded(item.id.clone(), response).await?;
                    summary.succeeded += 1;
                }
                Err(err) => {
                    warn!("Retry item {} failed: {}", item.id, err);
                    let status = self.record_failure(&item, err.to_string()).await?;
                    Self::tally(&mut summary, status);
                }
            }
        }

        info!(
            "Retry drain: {} drained, {} succeeded, {} rescheduled, {} dead-lettered",
            summary.drained, summary.succeeded, summary.rescheduled, summary.dead_lettered
        );
        Ok(summary)
    }

    async fn record_failure(&self, item: &RetryQueueItem, error: String) -> Result<RetryStatus> {
        let delay = backoff_seconds_with_jitter(item.attempt_count);
        let next_retry_at = (Utc::now() + Duration::seconds(delay)).to_rfc3339();
        self.queue
            .record_failure(item.id.clone(), error, next_retry_at)
            .await
    }

    fn tally(summary: &mut DrainSummary, status: RetryStatus) {
        match status {
            RetryStatus::Failed => summary.dead_lettered += 1,
            _ => summary.rescheduled += 1,
        }
    }
}
