//! Constant variables.
///
/// Width of the identifier space in bits, SHA-1 digest size.
pub const KEY_BITS: usize = 160;
/// Simulated one-way latency of a message in ms.
pub const DEFAULT_HOP_LATENCY_MS: u64 = 2;
/// Delay before a sender learns a message was undeliverable.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_MAX_REQUEST_RETRIES: u32 = 3;
pub const DEFAULT_MAX_HOPS: u32 = 64;
/// A pending lookup, insert, retrieve or join fails after this long.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 10 * 1000;
pub const DEFAULT_STABILIZE_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_FIX_FINGER_INTERVAL_MS: u64 = 500;
pub const DEFAULT_SUCCESSOR_LIST_LEN: u8 = 3;
