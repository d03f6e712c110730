use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::{ItemError, PartyCounts};

/// Tracks the lifecycle status of a capture job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::InProgress => write!(f, "in_progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Kind of capture a job performs. Only party capture is orchestrated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Partes,
}

/// Payload for `JobStore::create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCaptureJob {
    pub kind: CaptureKind,
    pub requester_id: i64,
    pub credential_ids: Vec<i64>,
    pub item_count: usize,
    pub started_at: DateTime<Utc>,
}

/// The one mutable record kept per orchestrator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureJob {
    pub id: i64,
    pub kind: CaptureKind,
    pub requester_id: i64,
    pub credential_ids: Vec<i64>,
    pub item_count: usize,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub result: Option<JobSummary>,
    pub error: Option<String>,
}

impl CaptureJob {
    pub fn from_new(id: i64, new: NewCaptureJob) -> Self {
        Self {
            id,
            kind: new.kind,
            requester_id: new.requester_id,
            credential_ids: new.credential_ids,
            item_count: new.item_count,
            status: JobStatus::InProgress,
            started_at: new.started_at,
            ended_at: None,
            result: None,
            error: None,
        }
    }

    pub fn apply(&mut self, patch: JobPatch) {
        self.status = patch.status;
        self.ended_at = Some(patch.ended_at);
        if patch.result.is_some() {
            self.result = patch.result;
        }
        self.error = patch.error;
    }
}

/// Terminal update written once when a job finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    pub status: JobStatus,
    pub ended_at: DateTime<Utc>,
    pub result: Option<JobSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetrics {
    pub average_item_ms: u64,
    /// `(items - errors) / items` as a percentage, one decimal place. Counts
    /// errors, not failed items, so several errors on one item lower it more.
    pub success_rate: f64,
}

impl JobMetrics {
    pub fn compute(total_items: usize, error_count: usize, duration_ms: u64) -> Self {
        if total_items == 0 {
            return Self::default();
        }
        let total = total_items as f64;
        let succeeded = total_items.saturating_sub(error_count) as f64;
        Self {
            average_item_ms: (duration_ms as f64 / total).round() as u64,
            success_rate: (succeeded / total * 1000.0).round() / 10.0,
        }
    }
}

/// Aggregate outcome of one job, stored on the job and returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: i64,
    pub status: JobStatus,
    pub total_items: usize,
    #[serde(flatten)]
    pub counts: PartyCounts,
    pub error_count: usize,
    pub errors: Vec<ItemError>,
    pub duration_ms: u64,
    pub audit_ids: Vec<String>,
    pub audit_write_failures: usize,
    pub warnings: Vec<String>,
    pub metrics: JobMetrics,
}

impl JobSummary {
    /// Error text stored on the job row at finalize.
    pub fn error_text(&self) -> Option<String> {
        let warnings = self.warnings.join("; ");
        match (self.error_count, warnings.is_empty()) {
            (0, true) => None,
            (0, false) => Some(warnings),
            (n, true) => Some(format!("{n} error(s) during capture")),
            (n, false) => Some(format!("{n} error(s) during capture; {warnings}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(error_count: usize, warnings: Vec<String>) -> JobSummary {
        JobSummary {
            job_id: 1,
            status: JobStatus::Completed,
            total_items: 3,
            counts: PartyCounts::default(),
            error_count,
            errors: Vec::new(),
            duration_ms: 0,
            audit_ids: Vec::new(),
            audit_write_failures: 0,
            warnings,
            metrics: JobMetrics::default(),
        }
    }

    #[test]
    fn error_text_variants() {
        assert_eq!(summary(0, vec![]).error_text(), None);
        assert_eq!(
            summary(2, vec![]).error_text().as_deref(),
            Some("2 error(s) during capture")
        );
        assert_eq!(
            summary(0, vec!["mismatch".into()]).error_text().as_deref(),
            Some("mismatch")
        );
        assert_eq!(
            summary(1, vec!["mismatch".into()]).error_text().as_deref(),
            Some("1 error(s) during capture; mismatch")
        );
    }

    #[test]
    fn metrics_round_like_a_dashboard() {
        let m = JobMetrics::compute(3, 1, 1000);
        assert_eq!(m.average_item_ms, 333);
        assert_eq!(m.success_rate, 66.7);
        assert_eq!(JobMetrics::compute(0, 0, 10), JobMetrics::default());
    }

    #[test]
    fn success_rate_counts_errors_not_items() {
        // Two errors reported on the same item out of four.
        assert_eq!(JobMetrics::compute(4, 2, 0).success_rate, 50.0);
        assert_eq!(JobMetrics::compute(2, 5, 0).success_rate, 0.0);
    }

    #[test]
    fn summary_flattens_counts() {
        let json = serde_json::to_value(summary(0, vec![])).unwrap();
        assert!(json.get("total_parties").is_some());
        assert!(json.get("counts").is_none());
        assert_eq!(json["status"], "completed");
    }

    #[test]
    fn apply_patch_finalizes_job() {
        let mut job = CaptureJob::from_new(
            9,
            NewCaptureJob {
                kind: CaptureKind::Partes,
                requester_id: 1,
                credential_ids: vec![5],
                item_count: 3,
                started_at: Utc::now(),
            },
        );
        assert_eq!(job.status, JobStatus::InProgress);
        job.apply(JobPatch {
            status: JobStatus::Failed,
            ended_at: Utc::now(),
            result: None,
            error: Some("boom".into()),
        });
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.ended_at.is_some());
        assert_eq!(job.error.as_deref(), Some("boom"));
    }
}
