//! Store key encoding for order records.
//!
//! Every order lives under `order:<decimal id>`. The encoding is a pure
//! function of the identifier, so keys written by one process are found by
//! any other.

/// Namespace prefix shared by every primary order key.
pub const ORDER_KEY_PREFIX: &str = "order:";

/// Glob pattern matching every primary order key.
pub const ORDER_KEY_PATTERN: &str = "order:*";

/// Default name of the set holding the keys of all live orders.
pub const DEFAULT_INDEX_KEY: &str = "orders";

pub fn order_key(order_id: u64) -> String {
    format!("{ORDER_KEY_PREFIX}{order_id}")
}

/// Recovers the identifier from a key produced by [`order_key`].
///
/// Only the canonical decimal form is accepted, so `order:042` is rejected.
pub fn parse_order_key(key: &str) -> Option<u64> {
    let digits = key.strip_prefix(ORDER_KEY_PREFIX)?;
    let order_id: u64 = digits.parse().ok()?;
    (order_id.to_string() == digits).then_some(order_id)
}
