//! Durable key-value store interface and an in-memory implementation.
//!
//! The store is the single source of truth for persisted energy amounts and
//! the transport source registry. Access is serialized by the single-threaded
//! tick scheduler, so the interface takes `&mut self` for writes and performs
//! no locking of its own.
//!
//! [`MemoryStore`] can be written out as a versioned `bitcode` snapshot and
//! restored, which is how restarts are exercised in tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A stored value: a primitive, a string, or a structured record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    Record(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Look up a field of a record value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Build a record from `(name, value)` pairs.
    pub fn record<I, K>(fields: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// A synchronous, always-available key-value store.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
    fn delete(&mut self, key: &str);
    /// All keys starting with `prefix`, in ascending order.
    fn list_keys(&self, prefix: &str) -> Vec<String>;
}

/// `BTreeMap`-backed store. Keys iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    fn delete(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn list_keys(&self, prefix: &str) -> Vec<String> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Magic number identifying a store snapshot.
pub const STORE_MAGIC: u32 = 0xC0DE_5701;

/// Current snapshot format version.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// Errors from reading or writing a store snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", STORE_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported snapshot version {0} (this build reads {STORE_FORMAT_VERSION})")]
    UnsupportedVersion(u32),
}

#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    magic: u32,
    version: u32,
    store: MemoryStore,
}

impl MemoryStore {
    /// Serialize the whole store with a versioned header.
    pub fn to_snapshot(&self) -> Result<Vec<u8>, StoreError> {
        let snapshot = StoreSnapshot {
            magic: STORE_MAGIC,
            version: STORE_FORMAT_VERSION,
            store: self.clone(),
        };
        bitcode::serialize(&snapshot).map_err(|e| StoreError::Encode(e.to_string()))
    }

    /// Restore a store written by [`to_snapshot`](Self::to_snapshot).
    pub fn from_snapshot(data: &[u8]) -> Result<Self, StoreError> {
        let snapshot: StoreSnapshot =
            bitcode::deserialize(data).map_err(|e| StoreError::Decode(e.to_string()))?;
        if snapshot.magic != STORE_MAGIC {
            return Err(StoreError::InvalidMagic(snapshot.magic));
        }
        if snapshot.version != STORE_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let mut store = MemoryStore::new();
        store.set("a", Value::Int(3));
        assert_eq!(store.get("a"), Some(Value::Int(3)));
        store.delete("a");
        assert_eq!(store.get("a"), None);
        store.delete("a");
        assert!(store.is_empty());
    }

    #[test]
    fn list_keys_filters_by_prefix() {
        let mut store = MemoryStore::new();
        store.set("source_1,2,3", Value::Int(0));
        store.set("source_-4,5,6", Value::Int(1));
        store.set("energy_0:1,2,3", Value::Int(50));
        store.set("sourcery", Value::Bool(true));

        let keys = store.list_keys("source_");
        assert_eq!(keys, vec!["source_-4,5,6".to_string(), "source_1,2,3".to_string()]);
        assert_eq!(store.list_keys("energy_").len(), 1);
        assert!(store.list_keys("zzz").is_empty());
    }

    #[test]
    fn record_fields() {
        let v = Value::record([("dimension", Value::Int(2)), ("validated_at", Value::Int(40))]);
        assert_eq!(v.field("dimension").and_then(Value::as_int), Some(2));
        assert!(v.field("missing").is_none());
        assert!(Value::Int(1).field("dimension").is_none());
    }

    #[test]
    fn snapshot_restores_contents() {
        let mut store = MemoryStore::new();
        store.set("energy_0:0,0,0", Value::Int(120));
        store.set("source_1,1,1", Value::record([("dimension", Value::Int(0))]));

        let bytes = store.to_snapshot().unwrap();
        let restored = MemoryStore::from_snapshot(&bytes).unwrap();
        assert_eq!(restored, store);
    }

    #[test]
    fn snapshot_rejects_garbage() {
        assert!(MemoryStore::from_snapshot(&[1, 2, 3]).is_err());
    }
}
