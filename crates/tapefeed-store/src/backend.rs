//! The injectable backend seam for record storage.
//!
//! [`StoreBackend`] abstracts the handful of primitive operations the keyed
//! event store needs from its backing key-value store: hash reads/writes, an
//! atomic numeric field increment, and set membership for the per-category
//! identifier index. The production implementation is
//! [`RedisBackend`](crate::redis::RedisBackend); [`MemoryBackend`] is the
//! in-process stand-in used by tests and single-node development.
//!
//! Atomicity contract: `hash_increment` must be a single atomic operation
//! against the store -- never a read-modify-write in the caller. Redis gets
//! this from `HINCRBYFLOAT`; the memory backend holds its one mutex across
//! the whole increment.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tapefeed_types::{FieldMap, FieldValue};
use tokio::sync::Mutex;

use crate::error::StoreError;

/// Primitive key-value operations required by the keyed event store.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Liveness probe against the backing store.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Replace the hash at `key` with exactly `fields` (full overwrite).
    ///
    /// A hash cannot hold zero fields (Redis has no empty-hash state), so
    /// replacing with an empty mapping deletes the key: a zero-field record
    /// reads back absent on every backend.
    async fn hash_replace(&self, key: &str, fields: &FieldMap) -> Result<(), StoreError>;

    /// Merge `fields` into the hash at `key`, creating it if absent.
    /// Merging an empty mapping is a no-op.
    async fn hash_merge(&self, key: &str, fields: &FieldMap) -> Result<(), StoreError>;

    /// Read the full hash at `key`. Returns `None` when the key is absent.
    async fn hash_get_all(&self, key: &str) -> Result<Option<FieldMap>, StoreError>;

    /// Atomically increment the numeric field `field` of the hash at `key`
    /// by `amount`, creating the hash and/or field (from zero) as needed.
    /// Returns the new value.
    async fn hash_increment(
        &self,
        key: &str,
        field: &str,
        amount: f64,
    ) -> Result<f64, StoreError>;

    /// Delete `key`. Returns `true` if the key existed.
    async fn delete_key(&self, key: &str) -> Result<bool, StoreError>;

    /// Add `member` to the set at `key`.
    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// Remove `member` from the set at `key`.
    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// Read all members of the set at `key`. Order is unspecified.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

/// In-memory tables guarded by the [`MemoryBackend`] mutex.
#[derive(Debug, Default)]
struct MemoryTables {
    hashes: HashMap<String, FieldMap>,
    sets: HashMap<String, BTreeSet<String>>,
}

/// In-process [`StoreBackend`] used by tests and development.
///
/// One mutex guards both tables, so every operation -- including the
/// increment -- is atomic with respect to concurrent callers.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<MemoryTables>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn hash_replace(&self, key: &str, fields: &FieldMap) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if fields.is_empty() {
            tables.hashes.remove(key);
        } else {
            tables.hashes.insert(key.to_owned(), fields.clone());
        }
        Ok(())
    }

    async fn hash_merge(&self, key: &str, fields: &FieldMap) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.lock().await;
        let hash = tables.hashes.entry(key.to_owned()).or_default();
        for (name, value) in fields {
            hash.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Option<FieldMap>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.hashes.get(key).cloned())
    }

    async fn hash_increment(
        &self,
        key: &str,
        field: &str,
        amount: f64,
    ) -> Result<f64, StoreError> {
        let mut tables = self.tables.lock().await;
        let hash = tables.hashes.entry(key.to_owned()).or_default();
        let current = hash.get(field).and_then(FieldValue::as_f64).unwrap_or(0.0);
        let next = current + amount;
        hash.insert(field.to_owned(), FieldValue::Float(next));
        Ok(next)
    }

    async fn delete_key(&self, key: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.hashes.remove(key).is_some() | tables.sets.remove(key).is_some())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables
            .sets
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(set) = tables.sets.get_mut(key) {
            set.remove(member);
            if set.is_empty() {
                tables.sets.remove(key);
            }
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), FieldValue::from(*v)))
            .collect()
    }

    #[tokio::test]
    async fn replace_is_a_full_overwrite() {
        let backend = MemoryBackend::new();
        backend
            .hash_replace("k", &fields(&[("a", "1"), ("b", "2")]))
            .await
            .unwrap();
        backend.hash_replace("k", &fields(&[("c", "3")])).await.unwrap();

        let read = backend.hash_get_all("k").await.unwrap().unwrap();
        assert_eq!(read, fields(&[("c", "3")]));
    }

    #[tokio::test]
    async fn replace_with_no_fields_deletes_the_hash() {
        let backend = MemoryBackend::new();
        backend
            .hash_replace("k", &fields(&[("a", "1")]))
            .await
            .unwrap();
        backend.hash_replace("k", &FieldMap::new()).await.unwrap();

        assert_eq!(backend.hash_get_all("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn merge_with_no_fields_creates_nothing() {
        let backend = MemoryBackend::new();
        backend.hash_merge("k", &FieldMap::new()).await.unwrap();

        assert_eq!(backend.hash_get_all("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn merge_keeps_untouched_fields() {
        let backend = MemoryBackend::new();
        backend
            .hash_replace("k", &fields(&[("a", "1"), ("b", "2")]))
            .await
            .unwrap();
        backend.hash_merge("k", &fields(&[("b", "9")])).await.unwrap();

        let read = backend.hash_get_all("k").await.unwrap().unwrap();
        assert_eq!(read, fields(&[("a", "1"), ("b", "9")]));
    }

    #[tokio::test]
    async fn increment_starts_from_zero_and_accumulates() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.hash_increment("k", "n", 1.5).await.unwrap(), 1.5);
        assert_eq!(backend.hash_increment("k", "n", 1.0).await.unwrap(), 2.5);
    }

    #[tokio::test]
    async fn increment_parses_textual_values() {
        let backend = MemoryBackend::new();
        backend
            .hash_replace("k", &fields(&[("qty", "10")]))
            .await
            .unwrap();
        assert_eq!(backend.hash_increment("k", "qty", 2.0).await.unwrap(), 12.0);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let backend = MemoryBackend::new();
        assert!(!backend.delete_key("k").await.unwrap());
        backend.hash_replace("k", &fields(&[("a", "1")])).await.unwrap();
        assert!(backend.delete_key("k").await.unwrap());
        assert!(backend.hash_get_all("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_membership_round_trip() {
        let backend = MemoryBackend::new();
        backend.set_add("idx", "a").await.unwrap();
        backend.set_add("idx", "b").await.unwrap();
        backend.set_remove("idx", "a").await.unwrap();
        assert_eq!(backend.set_members("idx").await.unwrap(), vec!["b".to_owned()]);
    }
}
