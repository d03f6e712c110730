use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::AuditRecord;
use crate::error::PersistenceError;
use crate::ports::AuditStore;

#[derive(Debug, Serialize, Deserialize)]
struct Line {
    id: String,
    #[serde(flatten)]
    record: AuditRecord,
}

/// Append-only audit store writing one JSON document per line.
#[derive(Debug)]
pub struct JsonlAuditStore {
    path: PathBuf,
    // Serializes appends from this process so lines never interleave.
    write_lock: Mutex<()>,
}

impl JsonlAuditStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record back with its id.
    pub async fn read_all(&self) -> Result<Vec<(String, AuditRecord)>, PersistenceError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| -> Result<(String, AuditRecord), PersistenceError> {
                let line: Line = serde_json::from_str(l)?;
                Ok((line.id, line.record))
            })
            .collect()
    }
}

impl AuditStore for JsonlAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<String, PersistenceError> {
        let id = Uuid::new_v4().to_string();
        let mut encoded = serde_json::to_string(&Line {
            id: id.clone(),
            record: record.clone(),
        })?;
        encoded.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(encoded.as_bytes()).await?;
        file.flush().await?;
        Ok(id)
    }
}
