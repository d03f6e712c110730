use super::job::JobStatus;

/// How a job invocation ended, as seen by the lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Every group ran; per-item failures are folded into the counts.
    Finished {
        total_items: usize,
        failed_items: usize,
        error_count: usize,
    },
    /// Something escaped the per-item and per-group boundaries.
    Aborted(String),
}

/// The result of evaluating a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: JobStatus,
    pub to: JobStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("job already finalized as {0}")]
pub struct AlreadyFinalized(pub JobStatus);

/// Drives a capture job from `in_progress` to its terminal status.
///
/// - `Finished` with zero failed items completes.
/// - `Finished` where every item failed fails.
/// - `Finished` with partial failure completes (at least one item succeeded,
///   or fewer errors than items).
/// - `Aborted` always fails.
///
/// A terminal job never transitions again.
#[derive(Debug)]
pub struct StateMachine {
    status: JobStatus,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            status: JobStatus::InProgress,
        }
    }
}

impl StateMachine {
    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn next(&mut self, outcome: &JobOutcome) -> Result<Transition, AlreadyFinalized> {
        if self.status.is_terminal() {
            return Err(AlreadyFinalized(self.status));
        }
        let to = match outcome {
            JobOutcome::Finished {
                total_items,
                failed_items,
                error_count,
            } => derive_status(*total_items, *failed_items, *error_count),
            JobOutcome::Aborted(_) => JobStatus::Failed,
        };
        let transition = Transition {
            from: self.status,
            to,
        };
        self.status = to;
        Ok(transition)
    }
}

/// Terminal status for a job that ran to the end.
pub fn derive_status(total_items: usize, failed_items: usize, error_count: usize) -> JobStatus {
    let any_succeeded = failed_items < total_items;
    if error_count == 0 || any_succeeded || error_count < total_items {
        JobStatus::Completed
    } else {
        JobStatus::Failed
    }
}
