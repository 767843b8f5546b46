//! Typed CRUD over namespaced records, with event emission.
//!
//! Every mutating operation derives its storage key deterministically from
//! `(prefix, category, identifier)` and, immediately after the mutation
//! commits, publishes a [`StoreEvent`] on the bus topic named after the
//! category. The mutation is always visible before its event is observable;
//! no cross-category ordering is promised.
//!
//! # Key scheme
//!
//! One deterministic scheme, used by reads and writes alike:
//!
//! - record hash: `{prefix}:{category}:{identifier}`
//! - category index set: `{prefix}:{category}:~index` (the `~` keeps the
//!   index out of the identifier space)
//! - **no identifier supplied**: the record lives at `{prefix}:{category}`
//!   -- the category alone serves as the key. This is an explicit branch;
//!   such singleton records are not tracked in the category index.

use std::sync::Arc;

use tracing::debug;

use tapefeed_types::record::IDENTIFIER_FIELD;
use tapefeed_types::{EventAction, FieldMap, FieldValue, Record, StoreEvent};

use crate::backend::StoreBackend;
use crate::bus::EventBus;
use crate::error::StoreError;

/// Suffix of the per-category identifier index set.
const INDEX_SUFFIX: &str = "~index";

/// Keyed record store that emits a mutation event for every write.
///
/// Backend and bus are injected so tests can substitute the in-memory
/// implementations; clones share both.
#[derive(Clone)]
pub struct KeyedEventStore {
    backend: Arc<dyn StoreBackend>,
    bus: Arc<dyn EventBus>,
    prefix: String,
}

impl KeyedEventStore {
    /// Build a store over `backend`, emitting events on `bus`, with all
    /// keys namespaced under `prefix`.
    pub fn new(
        backend: Arc<dyn StoreBackend>,
        bus: Arc<dyn EventBus>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            bus,
            prefix: prefix.into(),
        }
    }

    /// Derive the storage key for `(category, identifier)`.
    ///
    /// The empty identifier is the documented singleton branch: the
    /// category alone serves as the key.
    fn record_key(&self, category: &str, identifier: &str) -> String {
        if identifier.is_empty() {
            format!("{}:{category}", self.prefix)
        } else {
            format!("{}:{category}:{identifier}", self.prefix)
        }
    }

    /// Derive the identifier index key for `category`.
    fn index_key(&self, category: &str) -> String {
        format!("{}:{category}:{INDEX_SUFFIX}", self.prefix)
    }

    /// Write the full record, overwriting any previous fields, and emit a
    /// `create` event carrying the fields plus the identifier.
    ///
    /// Records cannot hold zero fields: writing an empty mapping removes
    /// any previous fields and the record reads back absent. The event is
    /// still emitted, carrying the identifier alone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write or the event publish fails. A
    /// failed publish does not roll the committed write back.
    pub async fn set(
        &self,
        category: &str,
        identifier: &str,
        fields: FieldMap,
    ) -> Result<(), StoreError> {
        let key = self.record_key(category, identifier);
        self.backend.hash_replace(&key, &fields).await?;
        self.index_add(category, identifier).await?;
        debug!(key, category, "record written");
        self.emit(category, EventAction::Create, identifier, fields)
            .await
    }

    /// Point read. Absent records are `Ok(None)`, never an error. No event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend read fails.
    pub async fn get(
        &self,
        category: &str,
        identifier: &str,
    ) -> Result<Option<FieldMap>, StoreError> {
        let key = self.record_key(category, identifier);
        self.backend.hash_get_all(&key).await
    }

    /// Read every indexed record in `category`. Order is unspecified.
    /// No event.
    ///
    /// Identifier-less singleton records are not indexed and therefore not
    /// returned here; read them with [`Self::get`] and an empty identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any backend read fails.
    pub async fn get_all(&self, category: &str) -> Result<Vec<Record>, StoreError> {
        let identifiers = self.backend.set_members(&self.index_key(category)).await?;
        let mut records = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            // A record deleted between the index read and here is skipped.
            if let Some(fields) = self.get(category, &identifier).await? {
                records.push(Record { identifier, fields });
            }
        }
        Ok(records)
    }

    /// Merge `updates` into the record, creating it when absent, and emit
    /// an `update` event carrying the merged fields plus the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write or the event publish fails.
    pub async fn update(
        &self,
        category: &str,
        identifier: &str,
        updates: FieldMap,
    ) -> Result<(), StoreError> {
        let key = self.record_key(category, identifier);
        self.backend.hash_merge(&key, &updates).await?;
        self.index_add(category, identifier).await?;
        debug!(key, category, "record updated");
        self.emit(category, EventAction::Update, identifier, updates)
            .await
    }

    /// Remove the record and emit a `delete` event carrying its
    /// pre-deletion fields plus the identifier.
    ///
    /// Deleting an absent record is not an error; the event payload
    /// degrades to the identifier alone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a backend operation or the event publish
    /// fails.
    pub async fn delete(&self, category: &str, identifier: &str) -> Result<(), StoreError> {
        let key = self.record_key(category, identifier);
        // Read first: the event carries the fields the record had.
        let prior = self.backend.hash_get_all(&key).await?;
        self.backend.delete_key(&key).await?;
        if !identifier.is_empty() {
            self.backend
                .set_remove(&self.index_key(category), identifier)
                .await?;
        }
        debug!(key, category, existed = prior.is_some(), "record deleted");
        self.emit(
            category,
            EventAction::Delete,
            identifier,
            prior.unwrap_or_default(),
        )
        .await
    }

    /// Amount applied by [`Self::increment`].
    pub const DEFAULT_INCREMENT: f64 = 1.0;

    /// Increment a numeric field by the default amount of 1.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the increment or the event publish fails.
    pub async fn increment(
        &self,
        category: &str,
        identifier: &str,
        field: &str,
    ) -> Result<f64, StoreError> {
        self.increment_field(category, identifier, field, Self::DEFAULT_INCREMENT)
            .await
    }

    /// Atomically increment a numeric field by `amount` and return the new
    /// value, emitting an `update` event carrying `{identifier, field: new}`.
    ///
    /// The increment is a single atomic operation in the backend
    /// (`HINCRBYFLOAT` on Redis), never a read-modify-write here.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the increment or the event publish fails.
    pub async fn increment_field(
        &self,
        category: &str,
        identifier: &str,
        field: &str,
        amount: f64,
    ) -> Result<f64, StoreError> {
        let key = self.record_key(category, identifier);
        let value = self.backend.hash_increment(&key, field, amount).await?;
        self.index_add(category, identifier).await?;
        debug!(key, field, value, "field incremented");

        let mut data = FieldMap::new();
        data.insert(field.to_owned(), FieldValue::Float(value));
        self.emit(category, EventAction::Update, identifier, data)
            .await?;
        Ok(value)
    }

    /// Track `identifier` in the category index (singletons are skipped).
    async fn index_add(&self, category: &str, identifier: &str) -> Result<(), StoreError> {
        if identifier.is_empty() {
            return Ok(());
        }
        self.backend
            .set_add(&self.index_key(category), identifier)
            .await
    }

    /// Publish the mutation event on the topic named after `category`,
    /// with the identifier folded into the payload.
    async fn emit(
        &self,
        category: &str,
        action: EventAction,
        identifier: &str,
        mut data: FieldMap,
    ) -> Result<(), StoreError> {
        data.insert(
            IDENTIFIER_FIELD.to_owned(),
            FieldValue::Text(identifier.to_owned()),
        );
        let event = StoreEvent::new(category, action, data);
        let payload = serde_json::to_vec(&event)?;
        self.bus.publish(category, &payload).await
    }
}
