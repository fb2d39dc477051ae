//! Retry, pricing and surrogate-identity policy helpers.

use md5::{Digest, Md5};
use rand::Rng;
use rust_decimal::Decimal;

/// Exponential backoff in seconds with cap.
pub fn backoff_seconds(attempt_count: i32) -> i64 {
    const MAX_EXPONENT: i32 = 8;
    const BASE_DELAY_SECONDS: i64 = 5;

    let capped = i64::from(attempt_count.clamp(0, MAX_EXPONENT));
    2_i64.pow(capped as u32) * BASE_DELAY_SECONDS
}

/// Backoff with up to 20% additive jitter, for retry queue scheduling.
pub fn backoff_seconds_with_jitter(attempt_count: i32) -> i64 {
    let base = backoff_seconds(attempt_count);
    let jitter = rand::thread_rng().gen_range(0..=(base / 5).max(1));
    base + jitter
}

/// Resolve the list price from parallel price tiers.
///
/// `default_price_no` is 1-based. A chosen tier that is unset or zero falls
/// back to tier 1; if tier 1 is also unset the price resolves to zero,
/// pending enrichment by a later run.
pub fn resolve_list_price(default_price_no: i32, tiers: &[Option<Decimal>]) -> Decimal {
    let tier_value = |no: i32| -> Option<Decimal> {
        if no < 1 {
            return None;
        }
        tiers
            .get((no - 1) as usize)
            .copied()
            .flatten()
            .filter(|value| !value.is_zero())
    };

    tier_value(default_price_no)
        .or_else(|| tier_value(1))
        .unwrap_or(Decimal::ZERO)
}

/// Derive the stable numeric surrogate sent to the external system for a
/// local order. Retried pushes of the same order are recognizable because
/// the surrogate never changes: first 8 bytes of MD5 over the local order
/// id, big-endian, sign bit cleared.
pub fn order_surrogate_id(local_order_id: &str) -> i64 {
    let digest = Md5::digest(local_order_id.as_bytes());
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (i64::from_be_bytes(bytes)) & i64::MAX
}
