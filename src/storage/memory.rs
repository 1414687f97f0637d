//! In-memory audit store, used by tests and short-lived deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionRecord, RecordStore};
use crate::error::ProxyError;

/// A stored record together with its (possibly pending) assistant output.
#[derive(Debug, Clone)]
pub struct StoredCompletion {
    pub record: CompletionRecord,
    pub assistant_output: Option<String>,
}

/// Audit store backed by a hash map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, StoredCompletion>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one record by identifier.
    pub fn get(&self, id: &str) -> Option<StoredCompletion> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.get(id).cloned())
    }

    /// Snapshot of all records; iteration order is not meaningful.
    pub fn records(&self) -> Vec<StoredCompletion> {
        self.records
            .lock()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, record: &CompletionRecord) -> Result<(), ProxyError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| ProxyError::StorageError("store mutex poisoned".to_string()))?;
        records.insert(
            record.id.clone(),
            StoredCompletion {
                record: record.clone(),
                assistant_output: None,
            },
        );
        Ok(())
    }

    async fn update_output(&self, id: &str, output: &str) -> Result<(), ProxyError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| ProxyError::StorageError("store mutex poisoned".to_string()))?;
        if let Some(stored) = records.get_mut(id) {
            stored.assistant_output = Some(output.to_string());
        }
        Ok(())
    }
}
