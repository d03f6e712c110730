//! Runs one group end to end: one session, one lock per item, one audit
//! record per item.
//!
//! Every failure below the group boundary (missing credential, failed login,
//! held lock, worker error or panic, audit write failure) is folded into the
//! running [`ResultTotals`]; nothing here returns an error to the caller.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::aggregate::ResultTotals;
use crate::domain::{
    AuditContext, AuditRecord, AuditStage, AuditWrite, Credential, ExecutionResult, ItemError,
    PartyCounts, TribunalConfig, WorkItem,
};
use crate::error::{LockError, WorkerError};
use crate::planner::Group;
use crate::ports::{AuditStore, CaptureContext, CaptureWorker, DistributedLock, SessionProvider};

pub const CAPTURE_IN_PROGRESS: &str = "capture already in progress";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// When false the lock service is never called.
    pub use_lock: bool,
    pub lock_ttl: Duration,
}

/// What the executor has to work with for one group.
#[derive(Debug, Clone, Copy)]
pub enum GroupAccess<'a> {
    NoCredential,
    Ready {
        credential: &'a Credential,
        config: &'a TribunalConfig,
    },
}

pub struct GroupExecutor<'a, S, W, L, A> {
    pub sessions: &'a S,
    pub worker: &'a W,
    pub lock: &'a L,
    pub audit: &'a A,
    pub settings: ExecutorSettings,
    pub ctx: &'a CaptureContext,
}

impl<S, W, L, A> GroupExecutor<'_, S, W, L, A>
where
    S: SessionProvider,
    W: CaptureWorker<S::Session>,
    L: DistributedLock,
    A: AuditStore,
{
    fn audit_ctx(&self) -> AuditContext {
        AuditContext {
            job_id: self.ctx.job_id,
            requester_id: self.ctx.requester.id,
        }
    }

    pub async fn run_group(
        &self,
        group: &Group,
        access: GroupAccess<'_>,
        mut totals: ResultTotals,
    ) -> ResultTotals {
        let (credential, config) = match access {
            GroupAccess::Ready { credential, config } => (credential, config),
            GroupAccess::NoCredential => {
                warn!(
                    group = %group.key,
                    items = group.items.len(),
                    "No credential for group, recording its items as failed"
                );
                let message = format!("no credential available for {}", group.key);
                for item in &group.items {
                    totals = self
                        .record_failure(totals, None, item, AuditStage::Credential, &message)
                        .await;
                }
                return totals;
            }
        };

        info!(group = %group.key, credential_id = credential.id, "Authenticating group");
        let session = match self.sessions.authenticate(credential, config).await {
            Ok(session) => session,
            Err(e) => {
                error!(group = %group.key, error = %e, "Authentication failed for group");
                let message = format!("authentication failed: {e}");
                for item in &group.items {
                    totals = self
                        .record_failure(totals, Some(credential.id), item, AuditStage::Auth, &message)
                        .await;
                }
                return totals;
            }
        };
        info!(
            group = %group.key,
            items = group.items.len(),
            "Authenticated, processing items with one session"
        );

        // The session is closed exactly once, even if something below unwinds.
        let run = AssertUnwindSafe(self.run_items(&session, credential, group, totals))
            .catch_unwind()
            .await;
        self.sessions.close(session).await;
        debug!(group = %group.key, "Session closed");

        match run {
            Ok(totals) => totals,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn run_items(
        &self,
        session: &S::Session,
        credential: &Credential,
        group: &Group,
        mut totals: ResultTotals,
    ) -> ResultTotals {
        for item in &group.items {
            totals = self.run_item(session, credential, item, totals).await;
        }
        totals
    }

    async fn run_item(
        &self,
        session: &S::Session,
        credential: &Credential,
        item: &WorkItem,
        totals: ResultTotals,
    ) -> ResultTotals {
        debug!(item_id = item.id, process_number = %item.process_number, "Processing item");

        let token = if self.settings.use_lock {
            match self.lock.acquire(&item.lock_key(), self.settings.lock_ttl).await {
                Ok(token) => Some(token),
                Err(LockError::Held { .. }) => {
                    warn!(item_id = item.id, "Capture already in progress for this item");
                    return self
                        .record_failure(
                            totals,
                            Some(credential.id),
                            item,
                            AuditStage::Lock,
                            CAPTURE_IN_PROGRESS,
                        )
                        .await;
                }
                Err(e) => {
                    // Never run the worker without the exclusion guarantee.
                    warn!(item_id = item.id, error = %e, "Could not acquire lock for item");
                    return self
                        .record_failure(
                            totals,
                            Some(credential.id),
                            item,
                            AuditStage::Lock,
                            &format!("lock unavailable: {e}"),
                        )
                        .await;
                }
            }
        } else {
            None
        };

        let outcome = match AssertUnwindSafe(self.worker.execute(session, item, self.ctx))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(WorkerError(format!(
                "worker panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };

        if let Some(token) = token {
            if let Err(e) = self.lock.release(token).await {
                warn!(item_id = item.id, error = %e, "Failed to release item lock");
            }
        }

        match outcome {
            Ok(output) => {
                let record = AuditRecord::captured(
                    self.audit_ctx(),
                    credential.id,
                    item,
                    output.counts,
                    &output.errors,
                    output.raw_payload,
                );
                let audit = self.write_audit(&record).await;
                info!(
                    item_id = item.id,
                    process_number = %item.process_number,
                    total_parties = output.counts.total_parties,
                    errors = output.errors.len(),
                    "Item captured"
                );
                totals.record(ExecutionResult {
                    item_id: item.id,
                    counts: output.counts,
                    errors: output
                        .errors
                        .into_iter()
                        .map(|message| ItemError::new(item, message))
                        .collect(),
                    audit,
                })
            }
            Err(e) => {
                error!(
                    item_id = item.id,
                    process_number = %item.process_number,
                    error = %e,
                    "Worker failed for item"
                );
                self.record_failure(
                    totals,
                    Some(credential.id),
                    item,
                    AuditStage::Capture,
                    &e.to_string(),
                )
                .await
            }
        }
    }

    /// Writes the audit record of an item that produced no capture and folds
    /// its single error into the totals.
    async fn record_failure(
        &self,
        totals: ResultTotals,
        credential_id: Option<i64>,
        item: &WorkItem,
        stage: AuditStage,
        message: &str,
    ) -> ResultTotals {
        let record = AuditRecord::failed(self.audit_ctx(), credential_id, item, stage, message);
        let audit = self.write_audit(&record).await;
        totals.record(ExecutionResult {
            item_id: item.id,
            counts: PartyCounts::default(),
            errors: vec![ItemError::new(item, message)],
            audit,
        })
    }

    async fn write_audit(&self, record: &AuditRecord) -> AuditWrite {
        match self.audit.append(record).await {
            Ok(id) => AuditWrite::Written(id),
            Err(e) => {
                warn!(
                    item_id = record.request.item_id,
                    process_number = %record.request.process_number,
                    error = %e,
                    "Failed to write audit record"
                );
                AuditWrite::Failed(e.to_string())
            }
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
