//! Scheduler constants for the periodically triggered sync runs.

/// Inbound catalog pull cadence in seconds.
pub const INBOUND_SYNC_INTERVAL_SECS: u64 = 300;

/// Outbound order push cadence in seconds.
pub const OUTBOUND_SYNC_INTERVAL_SECS: u64 = 120;

/// Maximum jitter (seconds) added to periodic run intervals.
pub const SYNC_INTERVAL_JITTER_SECS: u64 = 15;

/// Maximum retry queue items consumed per drain pass.
pub const RETRY_DRAIN_BATCH_SIZE: i64 = 50;

/// Default retry budget for enqueued work.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;
