//! Seams to the systems the orchestrator drives but does not own.
//!
//! The orchestrator is generic over these traits, so production backends,
//! the simulated portal used by `captura demo`, and test doubles all plug in
//! the same way.

#![allow(async_fn_in_trait)]

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{
    AuditRecord, CaptureOutput, Credential, GroupKey, JobPatch, NewCaptureJob, Requester,
    TribunalConfig, WorkItem,
};
use crate::error::{
    AuthenticationError, DirectoryError, LockError, PersistenceError, WorkerError,
};
use crate::request::ItemFilter;

/// Opens authenticated sessions against a court system.
pub trait SessionProvider {
    type Session;

    async fn authenticate(
        &self,
        credential: &Credential,
        config: &TribunalConfig,
    ) -> Result<Self::Session, AuthenticationError>;

    /// Tears the session down. Called exactly once per opened session.
    async fn close(&self, session: Self::Session);
}

/// Per-invocation data the worker needs besides the session and the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureContext {
    pub job_id: i64,
    pub requester: Requester,
}

/// Fetches and persists the parties of one process using an open session.
pub trait CaptureWorker<S> {
    async fn execute(
        &self,
        session: &S,
        item: &WorkItem,
        ctx: &CaptureContext,
    ) -> Result<CaptureOutput, WorkerError>;
}

/// Proof of ownership for a held lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockToken {
    pub key: String,
    pub owner: String,
}

/// TTL-bounded mutual exclusion keyed by work-item identity, shared across
/// concurrent invocations.
pub trait DistributedLock {
    /// Fails with [`LockError::Held`] when another owner has the key.
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<LockToken, LockError>;

    async fn release(&self, token: LockToken) -> Result<(), LockError>;
}

/// Append-only sink for per-item audit records.
pub trait AuditStore {
    /// Returns the id of the stored record.
    async fn append(&self, record: &AuditRecord) -> Result<String, PersistenceError>;
}

pub trait JobStore {
    async fn create(&self, job: &NewCaptureJob) -> Result<i64, PersistenceError>;

    async fn update(&self, id: i64, patch: &JobPatch) -> Result<(), PersistenceError>;
}

/// Resolves the inputs of a request: who asks, with which credentials, for which processes.
pub trait CaptureDirectory {
    async fn find_requester(&self, id: i64) -> Result<Option<Requester>, DirectoryError>;

    async fn find_credential(&self, id: i64) -> Result<Option<Credential>, DirectoryError>;

    /// Items matching every non-empty dimension of the filter.
    async fn find_items(&self, filter: &ItemFilter) -> Result<Vec<WorkItem>, DirectoryError>;

    async fn tribunal_config(&self, key: GroupKey) -> Result<TribunalConfig, DirectoryError>;
}

impl<T: DistributedLock> DistributedLock for Arc<T> {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<LockToken, LockError> {
        (**self).acquire(key, ttl).await
    }

    async fn release(&self, token: LockToken) -> Result<(), LockError> {
        (**self).release(token).await
    }
}

impl<T: AuditStore> AuditStore for Arc<T> {
    async fn append(&self, record: &AuditRecord) -> Result<String, PersistenceError> {
        (**self).append(record).await
    }
}

impl<T: JobStore> JobStore for Arc<T> {
    async fn create(&self, job: &NewCaptureJob) -> Result<i64, PersistenceError> {
        (**self).create(job).await
    }

    async fn update(&self, id: i64, patch: &JobPatch) -> Result<(), PersistenceError> {
        (**self).update(id, patch).await
    }
}
