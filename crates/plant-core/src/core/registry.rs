//! Device Registry
//!
//! Durable, insertion-ordered list of registered devices, stored as one JSON
//! array under a single storage key.
//!
//! # Failure semantics
//!
//! - Writes (`add`, `remove`) surface storage failures as [`Error::Storage`].
//! - Reads (`list`, `get`) never fail: a missing, unreadable or corrupt blob
//!   is logged and treated as an empty registry.
//!
//! # Concurrency
//!
//! Each write is a read-modify-write of the whole blob. Callers are expected
//! to serialize writers; two interleaved writers lose one update.

use super::storage::KeyValueStore;
use crate::error::{Error, Result};
use crate::models::DeviceRecord;

/// Registry of plant-care devices keyed by [`DeviceRecord::id`]
pub struct DeviceRegistry<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> DeviceRegistry<S> {
    /// Create a registry persisting under `key` in `store`.
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Register a new device.
    ///
    /// Fails with [`Error::DuplicateId`] without touching storage when the id
    /// is already taken.
    pub fn add(&self, record: DeviceRecord) -> Result<()> {
        let mut records = self.list();

        if records.iter().any(|r| r.id == record.id) {
            tracing::info!(device_id = %record.id, "rejected duplicate device id");
            return Err(Error::DuplicateId(record.id));
        }

        tracing::info!(device_id = %record.id, name = %record.name, "registering device");
        records.push(record);
        self.persist(&records)
    }

    /// All registered devices in insertion order.
    pub fn list(&self) -> Vec<DeviceRecord> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "device registry unreadable, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<DeviceRecord>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "device registry corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    /// Look up one device by id.
    pub fn get(&self, id: &str) -> Option<DeviceRecord> {
        self.list().into_iter().find(|r| r.id == id)
    }

    /// Remove the device with `id`. Removing an unknown id is not an error.
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut records = self.list();
        let before = records.len();
        records.retain(|r| r.id != id);

        if records.len() == before {
            tracing::debug!(device_id = %id, "remove of unknown device id");
        } else {
            tracing::info!(device_id = %id, "removed device");
        }

        self.persist(&records)
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    /// The storage key this registry writes to.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn persist(&self, records: &[DeviceRecord]) -> Result<()> {
        let blob = serde_json::to_string(records)?;
        self.store.set(&self.key, &blob).map_err(|e| match e {
            Error::Storage(_) => e,
            other => Error::Storage(other.to_string()),
        })
    }
}
