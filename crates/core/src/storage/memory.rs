use dashmap::DashMap;

use crate::error::Result;
use crate::storage::KvStorageInterface;

#[derive(Debug, Clone)]
pub struct MemStorage<V>
where V: Clone
{
    table: DashMap<String, V>,
}

impl<V> Default for MemStorage<V>
where V: Clone
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemStorage<V>
where V: Clone
{
    pub fn new() -> Self {
        Self {
            table: DashMap::default(),
        }
    }
}

impl<V> KvStorageInterface<V> for MemStorage<V>
where V: Clone
{
    fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(self.table.get(key).map(|v| v.value().clone()))
    }

    fn put(&self, key: &str, value: &V) -> Result<()> {
        self.table.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<(String, V)>> {
        let mut items: Vec<(String, V)> = self
            .table
            .iter()
            .map(|kv| (kv.key().clone(), kv.value().clone()))
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(items)
    }

    fn remove(&self, key: &str) -> Result<Option<V>> {
        Ok(self.table.remove(key).map(|(_, v)| v))
    }

    fn clear(&self) -> Result<()> {
        self.table.clear();
        Ok(())
    }

    fn count(&self) -> Result<u32> {
        Ok(self.table.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::Did;

    #[test]
    fn memstorage_basic_interface_should_work() {
        let store = MemStorage::new();
        let addr = Did::from_name("alice").to_string();

        assert_eq!(store.get(&addr).unwrap(), None);

        store.put(&addr, &"value 1".to_string()).unwrap();
        assert_eq!(store.get(&addr).unwrap(), Some("value 1".into()));

        store.put(&addr, &"value 2".to_string()).unwrap();
        assert_eq!(store.get(&addr).unwrap(), Some("value 2".into()));
        assert_eq!(store.count().unwrap(), 1);

        assert_eq!(store.remove(&addr).unwrap(), Some("value 2".into()));
        assert_eq!(store.remove(&addr).unwrap(), None);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn memstorage_get_all_is_sorted() {
        let store = MemStorage::new();
        store.put("b", &2u8).unwrap();
        store.put("c", &3u8).unwrap();
        store.put("a", &1u8).unwrap();
        assert_eq!(store.get_all().unwrap(), vec![
            ("a".to_string(), 1),
            ("b".to_string(), 2),
            ("c".to_string(), 3),
        ]);
        store.clear().unwrap();
        assert!(store.get_all().unwrap().is_empty());
    }
}
