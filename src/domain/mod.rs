mod audit;
mod item;
mod job;
mod outcome;
mod state;

pub use audit::{AuditContext, AuditLogEntry, AuditRecord, AuditRequest, AuditStage, AuditStatus};
pub use item::{Credential, Grau, GroupKey, Requester, TribunalCode, TribunalConfig, WorkItem};
pub use job::{
    CaptureJob, CaptureKind, JobMetrics, JobPatch, JobStatus, JobSummary, NewCaptureJob,
};
pub use outcome::{AuditWrite, CaptureOutput, ExecutionResult, ItemError, PartyCounts};
pub use state::{AlreadyFinalized, JobOutcome, StateMachine, Transition, derive_status};
