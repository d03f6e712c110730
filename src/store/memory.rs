use std::collections::BTreeMap;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{AuditRecord, CaptureJob, JobPatch, NewCaptureJob};
use crate::error::PersistenceError;
use crate::ports::{AuditStore, JobStore};

/// Audit records kept in memory, in write order.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: Mutex<Vec<(String, AuditRecord)>>,
}

impl MemoryAuditStore {
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .await
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }
}

impl AuditStore for MemoryAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<String, PersistenceError> {
        let id = Uuid::new_v4().to_string();
        self.records.lock().await.push((id.clone(), record.clone()));
        Ok(id)
    }
}

/// Job rows kept in memory with incrementing ids.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<BTreeMap<i64, CaptureJob>>,
}

impl MemoryJobStore {
    pub async fn get(&self, id: i64) -> Option<CaptureJob> {
        self.jobs.lock().await.get(&id).cloned()
    }

    pub async fn all(&self) -> Vec<CaptureJob> {
        self.jobs.lock().await.values().cloned().collect()
    }
}

impl JobStore for MemoryJobStore {
    async fn create(&self, job: &NewCaptureJob) -> Result<i64, PersistenceError> {
        let mut jobs = self.jobs.lock().await;
        let id = jobs.keys().next_back().copied().unwrap_or(0) + 1;
        jobs.insert(id, CaptureJob::from_new(id, job.clone()));
        Ok(id)
    }

    async fn update(&self, id: i64, patch: &JobPatch) -> Result<(), PersistenceError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| PersistenceError::NotFound(format!("capture job {id}")))?;
        job.apply(patch.clone());
        Ok(())
    }
}
