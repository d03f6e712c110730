//! Test doubles shared by the executor and orchestrator tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::{
    AuditRecord, CaptureOutput, Credential, Grau, GroupKey, JobPatch, NewCaptureJob,
    PartyCounts, Requester, TribunalCode, TribunalConfig, WorkItem,
};
use crate::error::{
    AuthenticationError, DirectoryError, LockError, PersistenceError, WorkerError,
};
use crate::ports::{
    AuditStore, CaptureContext, CaptureDirectory, CaptureWorker, DistributedLock, JobStore,
    LockToken, SessionProvider,
};
use crate::request::ItemFilter;
use crate::store::{MemoryAuditStore, MemoryJobStore};

pub fn item(id: i64, region: u8, grau: Grau) -> WorkItem {
    WorkItem {
        id,
        process_number: format!("proc-{id}"),
        remote_id: id * 100,
        tribunal: TribunalCode::new(region).unwrap(),
        grau,
    }
}

pub fn credential(id: i64, region: u8, grau: Grau) -> Credential {
    Credential {
        id,
        tribunal: TribunalCode::new(region).unwrap(),
        grau,
        login: format!("login-{id}"),
        password: "secret".into(),
    }
}

pub fn tribunal_config(key: GroupKey) -> TribunalConfig {
    TribunalConfig {
        key,
        login_url: format!("https://pje.{}.example/login", key.tribunal),
        api_base_url: format!("https://pje.{}.example/api", key.tribunal),
        login_timeout_ms: None,
    }
}

pub fn requester(id: i64) -> Requester {
    Requester {
        id,
        name: "Dra. Ana Souza".into(),
        document: "12345678900".into(),
    }
}

#[derive(Debug)]
pub struct MockSession {
    pub key: GroupKey,
}

/// Session provider and worker in one, counting every call.
#[derive(Debug, Default)]
pub struct MockPortal {
    fail_login: Vec<GroupKey>,
    fail_worker: Vec<String>,
    panic_worker: Vec<String>,
    in_band_errors: Vec<String>,
    worker_delay: Option<Duration>,
    authentications: AtomicUsize,
    closes: AtomicUsize,
    executed: Mutex<Vec<i64>>,
    scope_mismatches: AtomicUsize,
}

impl MockPortal {
    pub fn fail_login_for(mut self, key: GroupKey) -> Self {
        self.fail_login.push(key);
        self
    }

    pub fn fail_worker_on(mut self, process_number: &str) -> Self {
        self.fail_worker.push(process_number.to_string());
        self
    }

    pub fn panic_worker_on(mut self, process_number: &str) -> Self {
        self.panic_worker.push(process_number.to_string());
        self
    }

    pub fn in_band_error_on(mut self, process_number: &str) -> Self {
        self.in_band_errors.push(process_number.to_string());
        self
    }

    pub fn with_worker_delay(mut self, delay: Duration) -> Self {
        self.worker_delay = Some(delay);
        self
    }

    pub fn authentications(&self) -> usize {
        self.authentications.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<i64> {
        self.executed.lock().unwrap().clone()
    }

    pub fn scope_mismatches(&self) -> usize {
        self.scope_mismatches.load(Ordering::SeqCst)
    }
}

impl SessionProvider for MockPortal {
    type Session = MockSession;

    async fn authenticate(
        &self,
        credential: &Credential,
        config: &TribunalConfig,
    ) -> Result<MockSession, AuthenticationError> {
        self.authentications.fetch_add(1, Ordering::SeqCst);
        let key = credential.group_key();
        assert_eq!(config.key, key, "tribunal config must match the credential scope");
        if self.fail_login.contains(&key) {
            return Err(AuthenticationError("invalid OTP".into()));
        }
        Ok(MockSession { key })
    }

    async fn close(&self, _session: MockSession) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl CaptureWorker<MockSession> for MockPortal {
    async fn execute(
        &self,
        session: &MockSession,
        item: &WorkItem,
        _ctx: &CaptureContext,
    ) -> Result<CaptureOutput, WorkerError> {
        self.executed.lock().unwrap().push(item.id);
        if session.key != item.group_key() {
            self.scope_mismatches.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(delay) = self.worker_delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_worker.contains(&item.process_number) {
            panic!("page crashed on {}", item.process_number);
        }
        if self.fail_worker.contains(&item.process_number) {
            return Err(WorkerError(format!("timeout loading {}", item.process_number)));
        }
        let errors = if self.in_band_errors.contains(&item.process_number) {
            vec!["failed to upsert party".to_string()]
        } else {
            Vec::new()
        };
        Ok(CaptureOutput {
            counts: PartyCounts {
                total_parties: 3,
                clients: 1,
                opposing_parties: 1,
                third_parties: 1,
                representatives: 2,
                links: 3,
            },
            errors,
            raw_payload: Some(serde_json::json!({ "processo": item.remote_id })),
        })
    }
}

/// Grants every key unless told to fail, and tracks how many locks are held at once.
#[derive(Debug, Default)]
pub struct RecordingLock {
    acquires: AtomicUsize,
    releases: AtomicUsize,
    held: AtomicUsize,
    max_held: AtomicUsize,
    fail_acquire: bool,
    fail_release: bool,
}

impl RecordingLock {
    /// Every acquire answers with a service error.
    pub fn failing_acquire() -> Self {
        Self {
            fail_acquire: true,
            ..Default::default()
        }
    }

    /// Every acquire is granted, every release answers with a service error.
    pub fn failing_release() -> Self {
        Self {
            fail_release: true,
            ..Default::default()
        }
    }

    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn max_held(&self) -> usize {
        self.max_held.load(Ordering::SeqCst)
    }
}

impl DistributedLock for RecordingLock {
    async fn acquire(&self, key: &str, _ttl: Duration) -> Result<LockToken, LockError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        if self.fail_acquire {
            return Err(LockError::Service("lock service unavailable".into()));
        }
        let held = self.held.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_held.fetch_max(held, Ordering::SeqCst);
        Ok(LockToken {
            key: key.to_string(),
            owner: "test".into(),
        })
    }

    async fn release(&self, _token: LockToken) -> Result<(), LockError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.held.fetch_sub(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(LockError::Service("lock service unavailable".into()));
        }
        Ok(())
    }
}

/// Audit store that rejects the records of chosen item ids.
#[derive(Debug, Default)]
pub struct FailingAuditStore {
    inner: MemoryAuditStore,
    failing_items: Vec<i64>,
}

impl FailingAuditStore {
    pub fn failing_on(item_ids: &[i64]) -> Self {
        Self {
            inner: MemoryAuditStore::default(),
            failing_items: item_ids.to_vec(),
        }
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.inner.records().await
    }
}

impl AuditStore for FailingAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<String, PersistenceError> {
        if self.failing_items.contains(&record.request.item_id) {
            return Err(PersistenceError::Backend("audit collection unavailable".into()));
        }
        self.inner.append(record).await
    }
}

/// Audit store whose every append panics.
#[derive(Debug, Default)]
pub struct PanickingAuditStore;

impl AuditStore for PanickingAuditStore {
    async fn append(&self, _record: &AuditRecord) -> Result<String, PersistenceError> {
        panic!("audit driver crashed");
    }
}

/// Job store whose create or update can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyJobStore {
    pub inner: MemoryJobStore,
    pub fail_create: bool,
    pub fail_update: bool,
    pub updates: AtomicUsize,
}

impl JobStore for FlakyJobStore {
    async fn create(&self, job: &NewCaptureJob) -> Result<i64, PersistenceError> {
        if self.fail_create {
            return Err(PersistenceError::Backend("insert rejected".into()));
        }
        self.inner.create(job).await
    }

    async fn update(&self, id: i64, patch: &JobPatch) -> Result<(), PersistenceError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_update {
            return Err(PersistenceError::Backend("update rejected".into()));
        }
        self.inner.update(id, patch).await
    }
}

#[derive(Debug, Default)]
pub struct MockDirectory {
    pub requesters: Vec<Requester>,
    pub credentials: Vec<Credential>,
    pub items: Vec<WorkItem>,
    pub broken_config: Option<GroupKey>,
}

impl CaptureDirectory for MockDirectory {
    async fn find_requester(&self, id: i64) -> Result<Option<Requester>, DirectoryError> {
        Ok(self.requesters.iter().find(|r| r.id == id).cloned())
    }

    async fn find_credential(&self, id: i64) -> Result<Option<Credential>, DirectoryError> {
        Ok(self.credentials.iter().find(|c| c.id == id).cloned())
    }

    async fn find_items(&self, filter: &ItemFilter) -> Result<Vec<WorkItem>, DirectoryError> {
        Ok(self
            .items
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    async fn tribunal_config(&self, key: GroupKey) -> Result<TribunalConfig, DirectoryError> {
        if self.broken_config == Some(key) {
            return Err(DirectoryError::Backend(format!("no config row for {key}")));
        }
        Ok(tribunal_config(key))
    }
}
