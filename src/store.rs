//! The record store: owns the persisted set of applications.
//!
//! The whole set lives as one JSON array under a single key of a
//! [`StorageBackend`]. Reads degrade to an empty set; writes surface errors.
//! Load-modify-save sequences (`add`, `import_merge`) are not atomic across
//! processes sharing the same backend.

use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{Application, RecordSet};

/// Key under which the record set is stored, shared with the browser app.
pub const STORAGE_KEY: &str = "jobApplications";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("storage quota exceeded ({needed} bytes needed, {capacity} available)")]
    QuotaExceeded { needed: usize, capacity: usize },

    #[error("database is full")]
    DatabaseFull,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Key-value persistence supplied by the host.
pub trait StorageBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), BackendError>;
    fn remove(&mut self, key: &str) -> Result<(), BackendError>;
}

/// In-process backend with an optional byte quota.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
    capacity: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose total stored bytes (keys plus values) may not exceed `capacity`.
    #[allow(dead_code)]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: Some(capacity),
        }
    }

    fn used_except(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        if let Some(capacity) = self.capacity {
            let needed = self.used_except(key) + key.len() + value.len();
            if needed > capacity {
                return Err(BackendError::QuotaExceeded { needed, capacity });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), BackendError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid data: expected an array of applications ({reason})")]
    SaveInvalidData { reason: String },

    #[error("Failed to save data to storage. Your storage may be full. ({source})")]
    StorageFull {
        #[source]
        source: BackendError,
    },

    #[error("No data to import")]
    ImportNoData,

    #[error("Failed to encode applications: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct RecordStore<B: StorageBackend> {
    backend: B,
    key: String,
}

impl<B: StorageBackend> RecordStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_key(backend, STORAGE_KEY)
    }

    pub fn with_key(backend: B, key: &str) -> Self {
        Self {
            backend,
            key: key.to_string(),
        }
    }

    #[allow(dead_code)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The persisted set, or an empty one if nothing usable is stored.
    pub fn load(&self) -> RecordSet {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read applications from storage");
                return Vec::new();
            }
        };

        let elements = match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(elements) => elements,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Stored applications are unreadable, treating as empty");
                return Vec::new();
            }
        };

        // elements decode independently; undecodable ones are dropped
        elements
            .into_iter()
            .enumerate()
            .filter_map(|(idx, value)| match serde_json::from_value::<Application>(value) {
                Ok(app) => Some(app),
                Err(e) => {
                    warn!(key = %self.key, index = idx, error = %e, "Skipping unreadable application");
                    None
                }
            })
            .collect()
    }

    /// Replace the persisted set with `records`.
    pub fn save(&mut self, records: &[Application]) -> Result<(), StoreError> {
        let payload = serde_json::to_string(records)?;
        self.backend
            .set(&self.key, &payload)
            .map_err(|source| StoreError::StorageFull { source })?;
        info!(count = records.len(), "Saved applications");
        Ok(())
    }

    /// Replace the persisted set with an untyped JSON payload.
    ///
    /// The payload must be an array of application objects; otherwise nothing is written.
    pub fn save_json(&mut self, payload: &str) -> Result<usize, StoreError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| StoreError::SaveInvalidData {
                reason: e.to_string(),
            })?;
        if !value.is_array() {
            return Err(StoreError::SaveInvalidData {
                reason: format!("got {}", json_kind(&value)),
            });
        }
        let records: RecordSet =
            serde_json::from_value(value).map_err(|e| StoreError::SaveInvalidData {
                reason: e.to_string(),
            })?;

        self.save(&records)?;
        Ok(records.len())
    }

    /// Append one application under a fresh id. Returns the id.
    pub fn add(&mut self, mut application: Application) -> Result<String, StoreError> {
        let mut records = self.load();
        let mut taken: HashSet<String> = records.iter().filter_map(|r| r.id.clone()).collect();

        let id = unique_id(Utc::now().timestamp_millis().to_string(), &mut taken);
        application.id = Some(id.clone());
        records.push(application);

        self.save(&records)?;
        debug!(%id, "Added application");
        Ok(id)
    }

    /// Replace everything stored with `records`. Returns how many were imported.
    pub fn import_replace(&mut self, records: RecordSet) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Err(StoreError::ImportNoData);
        }
        let imported = assign_import_ids(records, &mut HashSet::new());
        self.save(&imported)?;
        info!(count = imported.len(), "Imported applications (replace)");
        Ok(imported.len())
    }

    /// Append `records` after the stored set. Returns how many were imported.
    pub fn import_merge(&mut self, records: RecordSet) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Err(StoreError::ImportNoData);
        }
        let mut existing = self.load();
        let mut taken: HashSet<String> = existing.iter().filter_map(|r| r.id.clone()).collect();

        let imported = assign_import_ids(records, &mut taken);
        let count = imported.len();
        existing.extend(imported);

        self.save(&existing)?;
        info!(count, total = existing.len(), "Imported applications (merge)");
        Ok(count)
    }

    pub fn count(&self) -> usize {
        self.load().len()
    }

    /// Drop the stored set. Failures are logged, not raised.
    pub fn clear(&mut self) {
        match self.backend.remove(&self.key) {
            Ok(()) => info!("Cleared applications"),
            Err(e) => warn!(error = %e, "Failed to clear applications"),
        }
    }
}

/// Give every record without a usable id one derived from the import time and
/// its position, and reassign any id that collides with one already taken.
fn assign_import_ids(records: RecordSet, taken: &mut HashSet<String>) -> RecordSet {
    let stamp = Utc::now().timestamp_millis();

    records
        .into_iter()
        .enumerate()
        .map(|(idx, mut app)| {
            let carried = if app.has_id() { app.id.take() } else { None };
            let id = match carried {
                Some(id) if !taken.contains(&id) => {
                    taken.insert(id.clone());
                    id
                }
                _ => unique_id(format!("imported_{}_{}", stamp, idx), taken),
            };
            app.id = Some(id);
            app
        })
        .collect()
}

/// `base`, or `base_<n>` for the smallest n that is free. Marks the result as taken.
fn unique_id(base: String, taken: &mut HashSet<String>) -> String {
    let mut id = base.clone();
    let mut n = 1;
    while taken.contains(&id) {
        id = format!("{}_{}", base, n);
        n += 1;
    }
    taken.insert(id.clone());
    id
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
