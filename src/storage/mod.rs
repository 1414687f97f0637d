//! Audit record persistence.

mod memory;
mod sqlite;

pub use memory::{MemoryStore, StoredCompletion};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ProxyError;

/// One audited chat completion exchange.
///
/// The identifier is generated exactly once, at request time, and threads
/// through both the synchronous insert and the later output update.
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub model: Option<String>,
    pub system_prompt: String,
    pub user_prompt: String,
    pub client_addr: Option<String>,
    pub user_agent: Option<String>,
}

impl CompletionRecord {
    /// Create a record with a fresh identifier and the current time.
    pub fn new(
        model: Option<String>,
        system_prompt: String,
        user_prompt: String,
        client_addr: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            model,
            system_prompt,
            user_prompt,
            client_addr,
            user_agent,
        }
    }
}

/// Destination of audit records.
///
/// Both operations are fire-and-forget from the proxy's perspective:
/// callers log failures and continue, and neither write is allowed to
/// shape the client-visible response.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record at request time.
    async fn insert(&self, record: &CompletionRecord) -> Result<(), ProxyError>;

    /// Attach the reconstructed assistant output to an existing record.
    async fn update_output(&self, id: &str, output: &str) -> Result<(), ProxyError>;
}
