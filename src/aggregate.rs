//! Folding per-item results into the job summary, and the post-hoc audit
//! reconciliation.

use crate::domain::{
    AuditWrite, ExecutionResult, ItemError, JobMetrics, JobStatus, JobSummary, PartyCounts,
};

/// Running totals threaded through every item of every group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTotals {
    pub items: usize,
    pub failed_items: usize,
    pub counts: PartyCounts,
    pub errors: Vec<ItemError>,
    pub audit_ids: Vec<String>,
    pub audit_write_failures: usize,
}

impl ResultTotals {
    /// Folds one item result into the totals.
    pub fn record(mut self, result: ExecutionResult) -> Self {
        self.items += 1;
        if !result.succeeded() {
            self.failed_items += 1;
        }
        self.counts += result.counts;
        self.errors.extend(result.errors);
        match result.audit {
            AuditWrite::Written(id) => self.audit_ids.push(id),
            AuditWrite::Failed(_) => self.audit_write_failures += 1,
        }
        self
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn into_summary(
        self,
        job_id: i64,
        status: JobStatus,
        total_items: usize,
        duration_ms: u64,
        warnings: Vec<String>,
    ) -> JobSummary {
        JobSummary {
            job_id,
            status,
            total_items,
            counts: self.counts,
            error_count: self.errors.len(),
            metrics: JobMetrics::compute(total_items, self.errors.len(), duration_ms),
            errors: self.errors,
            duration_ms,
            audit_ids: self.audit_ids,
            audit_write_failures: self.audit_write_failures,
            warnings,
        }
    }
}

/// Compares audit records written against items requested. A mismatch is a
/// warning for the summary, never an error.
pub fn check_consistency(requested_items: usize, audit_records: usize) -> Option<String> {
    (requested_items != audit_records).then(|| {
        format!(
            "inconsistency: {requested_items} items processed but {audit_records} audit records written"
        )
    })
}
