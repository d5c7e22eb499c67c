#![warn(missing_docs)]
//! DHash, the content store kept by every virtual node.
//!
//! A vnode serves lookups only from its primary store, which holds the objects whose keys fall in
//! `(predecessor, did]`. The backup store holds a copy of the predecessor's primary store, pushed
//! by the predecessor on every stabilization round. It is never served, and is promoted into the
//! primary store when the predecessor is found dead.

use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::error::Result;
use crate::storage::KvStorageInterface;
use crate::storage::MemStorage;

/// An opaque value stored under a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Key of the object, usually SHA-1 of a resource name.
    pub key: Did,
    /// Raw bytes.
    pub value: Vec<u8>,
}

impl StoredObject {
    /// Create an object.
    pub fn new(key: Did, value: Vec<u8>) -> Self {
        Self { key, value }
    }
}

/// Primary and backup stores of one virtual node.
#[derive(Debug, Default, Clone)]
pub struct DHash {
    primary: MemStorage<StoredObject>,
    backup: MemStorage<StoredObject>,
}

impl DHash {
    /// Create empty stores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object in the primary store, replacing an older value.
    pub fn put(&self, object: &StoredObject) -> Result<()> {
        self.primary.put(&object.key.to_string(), object)
    }

    /// Fetch from the primary store.
    pub fn get(&self, key: Did) -> Result<Option<StoredObject>> {
        self.primary.get(&key.to_string())
    }

    /// Every object of the primary store, sorted by key.
    pub fn objects(&self) -> Result<Vec<StoredObject>> {
        Ok(self.primary.get_all()?.into_iter().map(|(_, v)| v).collect())
    }

    /// Every object of the backup store, sorted by key.
    pub fn backup_objects(&self) -> Result<Vec<StoredObject>> {
        Ok(self.backup.get_all()?.into_iter().map(|(_, v)| v).collect())
    }

    /// Copies of the primary objects whose key is not in `(lower, upper]`.
    pub fn outside(&self, lower: Did, upper: Did) -> Result<Vec<StoredObject>> {
        Ok(self
            .objects()?
            .into_iter()
            .filter(|o| !o.key.is_between_right_closed(lower, upper))
            .collect())
    }

    /// Install objects handed over by another vnode.
    pub fn install(&self, objects: &[StoredObject]) -> Result<()> {
        for o in objects {
            self.put(o)?;
        }
        Ok(())
    }

    /// Move objects from the primary store to the backup store, once the new owner acked them.
    pub fn demote(&self, keys: &[Did]) -> Result<()> {
        for key in keys {
            if let Some(object) = self.primary.remove(&key.to_string())? {
                self.backup.put(&key.to_string(), &object)?;
            }
        }
        Ok(())
    }

    /// Add a single replica pushed by the predecessor.
    pub fn replicate(&self, object: &StoredObject) -> Result<()> {
        self.backup.put(&object.key.to_string(), object)
    }

    /// Replace the whole backup store with a snapshot of the predecessor.
    pub fn replace_backup(&self, objects: &[StoredObject]) -> Result<()> {
        self.backup.clear()?;
        for o in objects {
            self.replicate(o)?;
        }
        Ok(())
    }

    /// Merge the backup store into the primary store, used when the predecessor died.
    /// Returns how many objects were promoted.
    pub fn promote_backup(&self) -> Result<usize> {
        let backup = self.backup_objects()?;
        let count = backup.len();
        for o in backup.iter() {
            if self.primary.get(&o.key.to_string())?.is_none() {
                self.put(o)?;
            }
        }
        self.backup.clear()?;
        Ok(count)
    }

    /// Drop everything.
    pub fn clear(&self) -> Result<()> {
        self.primary.clear()?;
        self.backup.clear()
    }

    /// Keys of the primary store.
    pub fn keys(&self) -> Result<Vec<Did>> {
        self.primary
            .get_all()?
            .into_iter()
            .map(|(k, _)| Did::from_str(&k))
            .collect()
    }
}
