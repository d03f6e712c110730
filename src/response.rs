//! HTTP-style envelope for the outcome of one capture invocation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::JobSummary;
use crate::error::CapturaError;

/// Status code plus JSON body, as an API handler would send it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn from_result(result: &Result<JobSummary, CapturaError>) -> Self {
        match result {
            Ok(summary) => Self {
                status: 200,
                body: serde_json::json!({
                    "success": true,
                    "message": "party capture finished",
                    "data": summary,
                }),
            },
            Err(err) => Self {
                status: err.http_status(),
                body: serde_json::to_value(err.to_body()).unwrap_or(Value::Null),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
