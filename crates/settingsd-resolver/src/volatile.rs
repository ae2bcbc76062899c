//! In-memory volatile-value map.
//!
//! A volatile key's value lives exclusively here; it is never written to
//! the `main` kind and is lost on process exit.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;

/// Partition key: (Category-Dim string, app id).
type PartitionKey = (String, String);

/// Thread-safe store of volatile key/value pairs, partitioned the same way
/// DB-backed records are.
#[derive(Default)]
pub struct VolatileMap {
    partitions: RwLock<HashMap<PartitionKey, Map<String, Value>>>,
}

impl VolatileMap {
    /// Construct an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write volatile key/value pairs into a partition, overwriting any
    /// existing values for the same keys.
    pub fn write(&self, category_dim: &str, app_id: &str, pairs: &Map<String, Value>) {
        let mut partitions = self.partitions.write().expect("volatile map lock poisoned");
        let slot = partitions.entry((category_dim.to_string(), app_id.to_string())).or_default();
        for (key, value) in pairs {
            slot.insert(key.clone(), value.clone());
        }
    }

    /// Read a partition's current volatile values.
    #[must_use]
    pub fn read(&self, category_dim: &str, app_id: &str) -> Map<String, Value> {
        let partitions = self.partitions.read().expect("volatile map lock poisoned");
        partitions
            .get(&(category_dim.to_string(), app_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Remove specific keys from a partition. Returns the keys that were
    /// actually present.
    pub fn purge_keys(&self, category_dim: &str, app_id: &str, keys: &[String]) -> Vec<String> {
        let mut partitions = self.partitions.write().expect("volatile map lock poisoned");
        let Some(slot) = partitions.get_mut(&(category_dim.to_string(), app_id.to_string())) else {
            return Vec::new();
        };
        keys.iter().filter(|key| slot.remove(*key).is_some()).cloned().collect()
    }

    /// Remove an entire partition (category reset).
    pub fn purge_partition(&self, category_dim: &str, app_id: &str) {
        self.partitions
            .write()
            .expect("volatile map lock poisoned")
            .remove(&(category_dim.to_string(), app_id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_then_read_round_trips() {
        let map = VolatileMap::new();
        let mut pairs = Map::new();
        pairs.insert("pin".to_string(), json!("0000"));
        map.write("system", "", &pairs);

        assert_eq!(map.read("system", "").get("pin"), Some(&json!("0000")));
    }

    #[test]
    fn purge_keys_removes_only_requested_keys() {
        let map = VolatileMap::new();
        let mut pairs = Map::new();
        pairs.insert("a".to_string(), json!(1));
        pairs.insert("b".to_string(), json!(2));
        map.write("system", "", &pairs);

        let purged = map.purge_keys("system", "", &["a".to_string()]);
        assert_eq!(purged, vec!["a".to_string()]);
        assert_eq!(map.read("system", "").get("a"), None);
        assert_eq!(map.read("system", "").get("b"), Some(&json!(2)));
    }

    #[test]
    fn purge_partition_clears_everything() {
        let map = VolatileMap::new();
        let mut pairs = Map::new();
        pairs.insert("a".to_string(), json!(1));
        map.write("system", "", &pairs);
        map.purge_partition("system", "");
        assert!(map.read("system", "").is_empty());
    }
}
