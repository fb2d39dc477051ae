//! Reconciliation engines between the local store and the external ERP:
//! inbound catalog pull, outbound order push, and the retry queue drain.

pub mod api;
pub mod inbound;
pub mod outbound;
pub mod retry;

#[cfg(test)]
pub(crate) mod testkit;

pub use api::{ErpApi, ErpGateway};
pub use inbound::{CatalogPullExecutor, InboundSyncDeps, InboundSyncEngine};
pub use outbound::{OrderPushExecutor, OutboundSyncEngine};
pub use retry::{DrainSummary, RetryExecutor, RetryQueueDrainer};
