use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tracing::{Instrument, Span, error, info, info_span, warn};
use uuid::Uuid;

use crate::aggregate::{ResultTotals, check_consistency};
use crate::config::CapturaConfig;
use crate::domain::{
    CaptureKind, Credential, JobOutcome, JobPatch, JobStatus, JobSummary, NewCaptureJob, Requester,
    StateMachine, WorkItem,
};
use crate::error::{CapturaError, DirectoryError};
use crate::executor::{ExecutorSettings, GroupAccess, GroupExecutor, panic_message};
use crate::planner::{self, CapturePlan};
use crate::ports::{
    AuditStore, CaptureContext, CaptureDirectory, CaptureWorker, DistributedLock, JobStore,
    SessionProvider,
};
use crate::request::{CaptureRequest, ValidatedRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub executor: ExecutorSettings,
    pub performance_threshold_ms: u64,
}

impl From<&CapturaConfig> for OrchestratorSettings {
    fn from(config: &CapturaConfig) -> Self {
        Self {
            executor: ExecutorSettings {
                use_lock: config.enable_distributed_lock,
                lock_ttl: config.lock_ttl(),
            },
            performance_threshold_ms: config.performance_threshold_ms,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&CapturaConfig::default())
    }
}

/// Requester, credentials and items a validated request resolved to.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub requester: Requester,
    pub credentials: Vec<Credential>,
    pub items: Vec<WorkItem>,
}

struct Finished {
    totals: ResultTotals,
    total_items: usize,
    duration_ms: u64,
    warnings: Vec<String>,
}

/// Drives one capture job from request to finalized job summary.
pub struct CaptureOrchestrator<D, S, W, L, A, J> {
    directory: D,
    sessions: S,
    worker: W,
    lock: L,
    audit: A,
    jobs: J,
    settings: OrchestratorSettings,
}

impl<D, S, W, L, A, J> CaptureOrchestrator<D, S, W, L, A, J>
where
    D: CaptureDirectory,
    S: SessionProvider,
    W: CaptureWorker<S::Session>,
    L: DistributedLock,
    A: AuditStore,
    J: JobStore,
{
    pub fn new(
        directory: D,
        sessions: S,
        worker: W,
        lock: L,
        audit: A,
        jobs: J,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            directory,
            sessions,
            worker,
            lock,
            audit,
            jobs,
            settings,
        }
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    pub fn jobs(&self) -> &J {
        &self.jobs
    }

    /// Validates and resolves a request and returns its grouping, without running anything.
    pub async fn plan(&self, request: &CaptureRequest) -> Result<CapturePlan, CapturaError> {
        let validated = request.validate()?;
        let resolved = self.resolve(&validated).await?;
        Ok(planner::plan(resolved.items, &resolved.credentials))
    }

    /// Runs a capture job. Partial failure is a successful return; only
    /// request errors and failures outside the group boundary are `Err`.
    pub async fn run(&self, request: &CaptureRequest) -> Result<JobSummary, CapturaError> {
        let span = info_span!(
            "capture_job",
            correlation_id = %Uuid::new_v4(),
            job_id = tracing::field::Empty
        );
        self.run_in_span(request, span.clone()).instrument(span).await
    }

    async fn run_in_span(
        &self,
        request: &CaptureRequest,
        span: Span,
    ) -> Result<JobSummary, CapturaError> {
        let validated = request.validate()?;
        let resolved = self.resolve(&validated).await?;

        let job_id = self
            .jobs
            .create(&NewCaptureJob {
                kind: CaptureKind::Partes,
                requester_id: resolved.requester.id,
                credential_ids: validated.credential_ids.clone(),
                item_count: resolved.items.len(),
                started_at: Utc::now(),
            })
            .await
            .inspect_err(|e| error!(error = %e, "Failed to create capture job"))?;
        span.record("job_id", job_id);
        info!(job_id, items = resolved.items.len(), "Capture job created");

        let mut lifecycle = StateMachine::default();
        // A panicking collaborator still has to leave the job finalized.
        let executed = AssertUnwindSafe(self.execute(job_id, resolved))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(CapturaError::Unhandled(format!(
                    "capture panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });
        let finished = match executed {
            Ok(finished) => finished,
            Err(e) => {
                error!(job_id, error = %e, "Capture job aborted");
                self.finalize_failed(&mut lifecycle, job_id, &e).await;
                return Err(e);
            }
        };

        let outcome = JobOutcome::Finished {
            total_items: finished.total_items,
            failed_items: finished.totals.failed_items,
            error_count: finished.totals.error_count(),
        };
        let transition = lifecycle
            .next(&outcome)
            .map_err(|e| CapturaError::Unhandled(e.to_string()))?;

        let summary = finished.totals.into_summary(
            job_id,
            transition.to,
            finished.total_items,
            finished.duration_ms,
            finished.warnings,
        );
        let patch = JobPatch {
            status: summary.status,
            ended_at: Utc::now(),
            result: Some(summary.clone()),
            error: summary.error_text(),
        };
        if let Err(e) = self.jobs.update(job_id, &patch).await {
            // Never report success while the stored job could still read in_progress.
            error!(job_id, error = %e, "Failed to finalize capture job");
            let err = CapturaError::from(e);
            self.write_failed(job_id, &err).await;
            return Err(err);
        }
        info!(
            job_id,
            from = %transition.from,
            to = %transition.to,
            "Capture job finalized"
        );

        self.report(&summary);
        Ok(summary)
    }

    async fn resolve(&self, request: &ValidatedRequest) -> Result<ResolvedRequest, CapturaError> {
        let requester = self
            .directory
            .find_requester(request.requester_id)
            .await
            .map_err(directory_error)?
            .ok_or_else(|| CapturaError::NotFound("requester not found".into()))?;

        let mut credentials = Vec::with_capacity(request.credential_ids.len());
        for &id in &request.credential_ids {
            let credential = self
                .directory
                .find_credential(id)
                .await
                .map_err(directory_error)?
                .ok_or_else(|| CapturaError::NotFound(format!("credential {id} not found")))?;
            credentials.push(credential);
        }

        let items = self
            .directory
            .find_items(&request.filter)
            .await
            .map_err(directory_error)?;
        if items.is_empty() {
            return Err(CapturaError::NotFound(
                "no work items match the given filters".into(),
            ));
        }

        Ok(ResolvedRequest {
            requester,
            credentials,
            items,
        })
    }

    async fn execute(
        &self,
        job_id: i64,
        resolved: ResolvedRequest,
    ) -> Result<Finished, CapturaError> {
        let start = Instant::now();
        let total_items = resolved.items.len();
        let plan = planner::plan(resolved.items, &resolved.credentials);
        info!(groups = plan.groups.len(), "Items grouped by tribunal and grau");

        let ctx = CaptureContext {
            job_id,
            requester: resolved.requester,
        };
        let executor = GroupExecutor {
            sessions: &self.sessions,
            worker: &self.worker,
            lock: &self.lock,
            audit: &self.audit,
            settings: self.settings.executor,
            ctx: &ctx,
        };

        let mut totals = ResultTotals::default();
        for group in &plan.groups {
            info!(group = %group.key, items = group.items.len(), "Processing group");
            totals = match &group.credential {
                None => {
                    executor
                        .run_group(group, GroupAccess::NoCredential, totals)
                        .await
                }
                Some(credential) => {
                    let config = self
                        .directory
                        .tribunal_config(group.key)
                        .await
                        .map_err(|e| {
                            CapturaError::Unhandled(format!(
                                "tribunal config for {} unavailable: {e}",
                                group.key
                            ))
                        })?;
                    let access = GroupAccess::Ready {
                        credential,
                        config: &config,
                    };
                    executor.run_group(group, access, totals).await
                }
            };
        }
        let duration_ms = duration_ms(start.elapsed());

        let mut warnings = Vec::new();
        if let Some(warning) = check_consistency(total_items, totals.audit_ids.len()) {
            warn!(
                audit_records = totals.audit_ids.len(),
                audit_write_failures = totals.audit_write_failures,
                %warning,
                "Inconsistency detected"
            );
            warnings.push(warning);
        }

        Ok(Finished {
            totals,
            total_items,
            duration_ms,
            warnings,
        })
    }

    async fn finalize_failed(&self, lifecycle: &mut StateMachine, job_id: i64, cause: &CapturaError) {
        match lifecycle.next(&JobOutcome::Aborted(cause.to_string())) {
            Ok(_) => self.write_failed(job_id, cause).await,
            Err(e) => warn!(job_id, error = %e, "Capture job already finalized"),
        }
    }

    // Best effort: a failure here is logged and swallowed.
    async fn write_failed(&self, job_id: i64, cause: &CapturaError) {
        let patch = JobPatch {
            status: JobStatus::Failed,
            ended_at: Utc::now(),
            result: None,
            error: Some(cause.to_string()),
        };
        match self.jobs.update(job_id, &patch).await {
            Ok(()) => info!(job_id, "Capture job marked as failed"),
            Err(e) => error!(job_id, error = %e, "Failed to mark capture job as failed"),
        }
    }

    fn report(&self, summary: &JobSummary) {
        info!(
            total_items = summary.total_items,
            duration_ms = summary.duration_ms,
            average_item_ms = summary.metrics.average_item_ms,
            success_rate = summary.metrics.success_rate,
            audit_records = summary.audit_ids.len(),
            audit_write_failures = summary.audit_write_failures,
            "Capture finished"
        );
        if summary.metrics.average_item_ms > self.settings.performance_threshold_ms {
            warn!(
                average_item_ms = summary.metrics.average_item_ms,
                threshold_ms = self.settings.performance_threshold_ms,
                "Capture slower than expected"
            );
        }
    }
}

fn directory_error(err: DirectoryError) -> CapturaError {
    match err {
        DirectoryError::Missing(message) => CapturaError::NotFound(message),
        DirectoryError::Backend(message) => CapturaError::Unhandled(message),
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
