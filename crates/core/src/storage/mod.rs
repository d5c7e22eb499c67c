//! Module of MemStorage

pub mod memory;

use crate::error::Result;
pub use crate::storage::memory::MemStorage;

/// Key value storage interface.
/// Calls are synchronous since every mutation happens inside the simulation loop.
pub trait KvStorageInterface<V> {
    /// Get a cache entry by `key`.
    fn get(&self, key: &str) -> Result<Option<V>>;

    /// Put `entry` in the cache under `key`.
    fn put(&self, key: &str, value: &V) -> Result<()>;

    /// All entries, sorted by key.
    fn get_all(&self) -> Result<Vec<(String, V)>>;

    /// Remove an `entry` by `key`, returning it.
    fn remove(&self, key: &str) -> Result<Option<V>>;

    /// Delete all values.
    fn clear(&self) -> Result<()>;

    /// Get the current storage usage.
    fn count(&self) -> Result<u32>;
}
