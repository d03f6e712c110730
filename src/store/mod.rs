//! Audit and job store backends.

mod jsonl;
mod memory;

pub use jsonl::JsonlAuditStore;
pub use memory::{MemoryAuditStore, MemoryJobStore};

use crate::config::CapturaConfig;
use crate::domain::AuditRecord;
use crate::error::PersistenceError;
use crate::ports::AuditStore;

/// Audit backend picked at startup from configuration.
#[derive(Debug)]
pub enum AuditBackend {
    Jsonl(JsonlAuditStore),
    Memory(MemoryAuditStore),
}

impl AuditBackend {
    /// JSON-lines file when `audit_log_path` is set, in-memory otherwise.
    pub fn from_config(config: &CapturaConfig) -> Self {
        match &config.audit_log_path {
            Some(path) => Self::Jsonl(JsonlAuditStore::new(path.clone())),
            None => Self::Memory(MemoryAuditStore::default()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Jsonl(store) => store.path().display().to_string(),
            Self::Memory(_) => "memory".to_string(),
        }
    }
}

impl AuditStore for AuditBackend {
    async fn append(&self, record: &AuditRecord) -> Result<String, PersistenceError> {
        match self {
            Self::Jsonl(store) => store.append(record).await,
            Self::Memory(store) => store.append(record).await,
        }
    }
}
