use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::{Grau, TribunalCode, WorkItem};
use super::outcome::PartyCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Error,
}

/// The stage an audit log line is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStage {
    Credential,
    Auth,
    Lock,
    Capture,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub stage: AuditStage,
    pub message: String,
    pub item_id: i64,
}

/// Echo of what was asked of the remote system for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRequest {
    pub item_id: i64,
    pub process_number: String,
    pub remote_id: i64,
}

/// Append-only record of one item attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub job_id: i64,
    pub requester_id: i64,
    pub credential_id: Option<i64>,
    pub tribunal: TribunalCode,
    pub grau: Grau,
    pub status: AuditStatus,
    pub request: AuditRequest,
    pub raw_payload: Option<serde_json::Value>,
    pub processed: Option<PartyCounts>,
    pub logs: Vec<AuditLogEntry>,
    /// First error message, if any.
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Fields shared by every audit record written within one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditContext {
    pub job_id: i64,
    pub requester_id: i64,
}

impl AuditRecord {
    fn base(ctx: AuditContext, credential_id: Option<i64>, item: &WorkItem) -> Self {
        Self {
            job_id: ctx.job_id,
            requester_id: ctx.requester_id,
            credential_id,
            tribunal: item.tribunal,
            grau: item.grau,
            status: AuditStatus::Error,
            request: AuditRequest {
                item_id: item.id,
                process_number: item.process_number.clone(),
                remote_id: item.remote_id,
            },
            raw_payload: None,
            processed: None,
            logs: Vec::new(),
            error: None,
            recorded_at: Utc::now(),
        }
    }

    /// Record for an item the worker actually ran on.
    pub fn captured(
        ctx: AuditContext,
        credential_id: i64,
        item: &WorkItem,
        counts: PartyCounts,
        errors: &[String],
        raw_payload: Option<serde_json::Value>,
    ) -> Self {
        let mut record = Self::base(ctx, Some(credential_id), item);
        record.status = if errors.is_empty() {
            AuditStatus::Success
        } else {
            AuditStatus::Error
        };
        record.raw_payload = raw_payload;
        record.processed = Some(counts);
        record.logs = errors
            .iter()
            .map(|message| AuditLogEntry {
                stage: AuditStage::Capture,
                message: message.clone(),
                item_id: item.id,
            })
            .collect();
        record.error = errors.first().cloned();
        record
    }

    /// Record for an item that never produced a capture result.
    pub fn failed(
        ctx: AuditContext,
        credential_id: Option<i64>,
        item: &WorkItem,
        stage: AuditStage,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let mut record = Self::base(ctx, credential_id, item);
        record.logs.push(AuditLogEntry {
            stage,
            message: message.clone(),
            item_id: item.id,
        });
        record.error = Some(message);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> WorkItem {
        WorkItem {
            id: 7,
            process_number: "0000001-00.2024.5.03.0001".into(),
            remote_id: 700,
            tribunal: TribunalCode::new(3).unwrap(),
            grau: Grau::PrimeiroGrau,
        }
    }

    const CTX: AuditContext = AuditContext {
        job_id: 1,
        requester_id: 2,
    };

    #[test]
    fn captured_without_errors_is_success() {
        let record = AuditRecord::captured(CTX, 5, &item(), PartyCounts::default(), &[], None);
        assert_eq!(record.status, AuditStatus::Success);
        assert!(record.error.is_none());
        assert!(record.logs.is_empty());
        assert_eq!(record.credential_id, Some(5));
    }

    #[test]
    fn captured_with_errors_keeps_first_as_summary() {
        let errors = vec!["party 1 failed".to_string(), "party 2 failed".to_string()];
        let record = AuditRecord::captured(CTX, 5, &item(), PartyCounts::default(), &errors, None);
        assert_eq!(record.status, AuditStatus::Error);
        assert_eq!(record.error.as_deref(), Some("party 1 failed"));
        assert_eq!(record.logs.len(), 2);
    }

    #[test]
    fn failed_record_has_no_payload() {
        let record = AuditRecord::failed(CTX, None, &item(), AuditStage::Credential, "no credential");
        assert_eq!(record.status, AuditStatus::Error);
        assert!(record.raw_payload.is_none());
        assert!(record.processed.is_none());
        assert_eq!(record.logs[0].stage, AuditStage::Credential);
        assert_eq!(record.request.remote_id, 700);
    }
}
